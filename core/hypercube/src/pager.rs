//! FILENAME: core/hypercube/src/pager.rs
//! PURPOSE: Cursor over the virtual grid of one committed cube.
//! CONTEXT: A pager remembers the window(s) it last fetched and the edge
//! flags the engine reported for them. It never caches cell data: every
//! call is a fresh round trip, and the cube path is re-resolved each time so
//! edits committed by the owner are observed.
//!
//! Several windows may be held at once (e.g. a frozen first column plus the
//! rest). They move in lockstep, and a walk ends as soon as any of them
//! reaches the edge.

use crate::cell::Cell;
use crate::config::PagerConfig;
use crate::error::{HyperCubeError, HyperCubeResult};
use crate::gateway::{DefinitionHandle, EngineGateway, ObjectId};
use crate::layout::HyperCubeLayout;
use crate::page::{DataPage, EdgeFlags, Page};
use crate::path::CubePath;
use crate::{log_debug, log_enter, log_exit, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards higher row indices.
    Next,
    /// Towards row 0.
    Previous,
}

pub struct Pager<'g, G: EngineGateway + ?Sized> {
    gateway: &'g G,
    object: ObjectId,
    path: CubePath,
    current_pages: Vec<Page>,
    /// Parallel to `current_pages`; all false until the first fetch.
    outside_edge: Vec<EdgeFlags>,
    /// `outside_edge` describes `current_pages`.
    edges_known: bool,
    config: PagerConfig,
}

impl<'g, G: EngineGateway + ?Sized> Pager<'g, G> {
    pub fn new(gateway: &'g G, object: ObjectId, path: CubePath, config: PagerConfig) -> Self {
        Pager {
            gateway,
            object,
            path,
            current_pages: Vec::new(),
            outside_edge: Vec::new(),
            edges_known: false,
            config,
        }
    }

    pub fn path(&self) -> &CubePath {
        &self.path
    }

    pub fn object_id(&self) -> ObjectId {
        self.object
    }

    pub fn config(&self) -> &PagerConfig {
        &self.config
    }

    // ========================================================================
    // CURSOR STATE
    // ========================================================================

    pub fn current_pages(&self) -> &[Page] {
        &self.current_pages
    }

    /// Replaces the cursor without fetching. Edge flags are reset.
    pub fn set_current_pages(&mut self, pages: Vec<Page>) -> HyperCubeResult<()> {
        for page in &pages {
            page.validate()?;
        }
        self.outside_edge = vec![EdgeFlags::default(); pages.len()];
        self.current_pages = pages;
        self.edges_known = false;
        Ok(())
    }

    pub fn outside_edge(&self) -> &[EdgeFlags] {
        &self.outside_edge
    }

    /// The last fetch reported that no rows exist below some window.
    pub fn is_at_row_edge(&self) -> bool {
        self.outside_edge.iter().any(|flags| flags.rows)
    }

    /// Some window already starts at row 0.
    pub fn is_at_top(&self) -> bool {
        self.current_pages.iter().any(|page| page.top == 0)
    }

    fn move_to(&mut self, pages: Vec<Page>, data: &[DataPage]) {
        self.outside_edge = data.iter().map(|d| d.outside_edge).collect();
        self.current_pages = pages;
        self.edges_known = true;
    }

    /// Derives the edge flags of a cursor that was set but never fetched
    /// from the grid size.
    fn learn_edges(&mut self) -> HyperCubeResult<()> {
        if self.edges_known {
            return Ok(());
        }
        let size = self.layout()?.size;
        self.outside_edge = self.current_pages.iter().map(|page| size.edges_of(page)).collect();
        self.edges_known = true;
        Ok(())
    }

    fn require_cursor(&self) -> HyperCubeResult<()> {
        if self.current_pages.is_empty() {
            return Err(HyperCubeError::validation(format!(
                "pager for {} has no current page",
                self.path
            )));
        }
        Ok(())
    }

    // ========================================================================
    // ENGINE ROUND TRIPS
    // ========================================================================

    fn resolve(&self) -> HyperCubeResult<DefinitionHandle> {
        self.gateway.resolve_path(self.object, &self.path)
    }

    fn fetch_with(&self, handle: &DefinitionHandle, pages: &[Page]) -> HyperCubeResult<Vec<DataPage>> {
        log_debug!(
            "PAGER",
            "evaluate {} rev {} windows {:?}",
            self.path,
            handle.revision,
            pages
        );
        let data = self.gateway.evaluate(handle, pages)?;
        if data.len() != pages.len() {
            return Err(HyperCubeError::EngineUnavailable(format!(
                "engine returned {} pages for {} windows",
                data.len(),
                pages.len()
            )));
        }
        Ok(data)
    }

    fn fetch(&self, pages: &[Page]) -> HyperCubeResult<(DefinitionHandle, Vec<DataPage>)> {
        for page in pages {
            page.validate()?;
        }
        let handle = self.resolve()?;
        let data = self.fetch_with(&handle, pages)?;
        Ok((handle, data))
    }

    /// Columns of the committed cube: dimensions plus measures.
    pub fn number_of_columns(&self) -> HyperCubeResult<usize> {
        Ok(self.resolve()?.column_count)
    }

    pub fn layout(&self) -> HyperCubeResult<HyperCubeLayout> {
        let handle = self.resolve()?;
        self.gateway.layout(&handle)
    }

    // ========================================================================
    // PAGING
    // ========================================================================

    /// Fetches explicit windows. The cursor is left untouched.
    pub fn get_data(&self, pages: &[Page]) -> HyperCubeResult<Vec<DataPage>> {
        Ok(self.fetch(pages)?.1)
    }

    /// Fetches `pages` and makes them the cursor.
    pub fn go_to(&mut self, pages: Vec<Page>) -> HyperCubeResult<Vec<DataPage>> {
        let (_, data) = self.fetch(&pages)?;
        self.move_to(pages, &data);
        Ok(data)
    }

    /// Re-fetches the cursor windows, refreshing the edge flags.
    pub fn get_current_pages(&mut self) -> HyperCubeResult<Vec<DataPage>> {
        self.require_cursor()?;
        let pages = self.current_pages.clone();
        self.go_to(pages)
    }

    pub fn get_first_page(&mut self) -> HyperCubeResult<Vec<DataPage>> {
        self.require_cursor()?;
        let pages = self.current_pages.iter().map(|page| page.at_top(0)).collect();
        self.go_to(pages)
    }

    /// Moves every window down by its height. At the row edge this returns
    /// empty pages without a round trip and the cursor stays put.
    pub fn get_next_page(&mut self) -> HyperCubeResult<Vec<DataPage>> {
        self.step(Direction::Next)
    }

    /// Moves every window up by its height, clamped at row 0. At the top this
    /// returns empty pages without a round trip.
    pub fn get_previous_page(&mut self) -> HyperCubeResult<Vec<DataPage>> {
        self.step(Direction::Previous)
    }

    fn stepped(&self, direction: Direction) -> Vec<Page> {
        self.current_pages
            .iter()
            .map(|page| match direction {
                Direction::Next => page.next_down(),
                Direction::Previous => page.previous_up(),
            })
            .collect()
    }

    fn at_end(&self, direction: Direction) -> bool {
        match direction {
            Direction::Next => self.is_at_row_edge(),
            Direction::Previous => self.is_at_top(),
        }
    }

    fn step(&mut self, direction: Direction) -> HyperCubeResult<Vec<DataPage>> {
        self.require_cursor()?;
        if direction == Direction::Next {
            self.learn_edges()?;
        }
        let pages = self.stepped(direction);
        if self.at_end(direction) {
            log_warn!("PAGER", "{:?} page requested past the edge of {}", direction, self.path);
            let flags = self.outside_edge.clone();
            return Ok(pages
                .into_iter()
                .zip(flags)
                .map(|(page, flags)| DataPage::past_edge(page, flags))
                .collect());
        }
        self.go_to(pages)
    }

    /// Fetches the last full-height window(s), probing the grid size first.
    pub fn get_last_page(&mut self) -> HyperCubeResult<Vec<DataPage>> {
        self.require_cursor()?;
        log_enter!("PAGER", "get_last_page", "{}", self.path);
        let rows = self.layout()?.row_count();
        let pages = self
            .current_pages
            .iter()
            .map(|page| page.at_top(rows.saturating_sub(page.height)))
            .collect();
        let data = self.go_to(pages)?;
        log_exit!("PAGER", "get_last_page", "{} rows", rows);
        Ok(data)
    }

    /// A lazy walk from `start` in `direction`, one round trip per pull.
    /// Nothing is fetched until the first pull.
    pub fn iterate_pages(&mut self, start: Vec<Page>, direction: Direction) -> PageIter<'_, 'g, G> {
        PageIter {
            pager: self,
            start,
            direction,
            state: IterState::Start,
        }
    }

    // ========================================================================
    // ROW ACCESS
    // ========================================================================

    /// The window covering every column, as tall as the configuration
    /// allows.
    pub fn full_width_window(&self) -> HyperCubeResult<Page> {
        let width = self.number_of_columns()?.max(1);
        let height = self
            .config
            .default_page_height
            .min(self.config.max_page_cells / width)
            .max(1);
        Ok(Page::with_size(width, height))
    }

    /// Streams every row of the cube, holding at most one page in memory.
    pub fn rows(&mut self) -> HyperCubeResult<RowIter<'_, 'g, G>> {
        let window = self.full_width_window()?;
        Ok(RowIter {
            pages: self.iterate_pages(vec![window], Direction::Next),
            buffered: Vec::new().into_iter(),
        })
    }

    /// Materializes at most `limit` rows.
    pub fn collect_rows(&mut self, limit: usize) -> HyperCubeResult<CollectedRows> {
        let mut rows = Vec::new();
        let mut iter = self.rows()?;
        while rows.len() < limit {
            match iter.next() {
                Some(row) => rows.push(row?),
                None => {
                    return Ok(CollectedRows {
                        rows,
                        truncated: false,
                    })
                }
            }
        }
        let truncated = match iter.next() {
            Some(row) => {
                row?;
                true
            }
            None => false,
        };
        if truncated {
            log_warn!("PAGER", "row collection of {} truncated at {} rows", iter.pages.pager.path, limit);
        }
        Ok(CollectedRows { rows, truncated })
    }

    /// `collect_rows` bounded by `PagerConfig::max_collected_rows`.
    pub fn collect_all_rows(&mut self) -> HyperCubeResult<CollectedRows> {
        let limit = self.config.max_collected_rows;
        self.collect_rows(limit)
    }
}

// ============================================================================
// PAGE ITERATOR
// ============================================================================

enum IterState {
    Start,
    Running { revision: u64 },
    Done,
}

/// Pull-based page sequence. Ends after the page that reaches the edge, or
/// with a `DefinitionChanged` error if the cube is re-committed mid-walk.
pub struct PageIter<'p, 'g, G: EngineGateway + ?Sized> {
    pager: &'p mut Pager<'g, G>,
    start: Vec<Page>,
    direction: Direction,
    state: IterState,
}

impl<'p, 'g, G: EngineGateway + ?Sized> PageIter<'p, 'g, G> {
    /// Rewinds to the start windows. The next pull fetches them again.
    pub fn restart(&mut self) {
        self.state = IterState::Start;
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    fn first(&mut self) -> HyperCubeResult<Vec<DataPage>> {
        let pages = self.start.clone();
        let (handle, data) = self.pager.fetch(&pages)?;
        self.pager.move_to(pages, &data);
        self.state = IterState::Running {
            revision: handle.revision,
        };
        Ok(data)
    }

    fn advance(&mut self, revision: u64) -> HyperCubeResult<Vec<DataPage>> {
        let handle = self.pager.resolve()?;
        if handle.revision != revision {
            return Err(HyperCubeError::DefinitionChanged(format!(
                "{} moved from revision {} to {}",
                self.pager.path, revision, handle.revision
            )));
        }
        let pages = self.pager.stepped(self.direction);
        let data = self.pager.fetch_with(&handle, &pages)?;
        self.pager.move_to(pages, &data);
        Ok(data)
    }
}

impl<'p, 'g, G: EngineGateway + ?Sized> Iterator for PageIter<'p, 'g, G> {
    type Item = HyperCubeResult<Vec<DataPage>>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = match self.state {
            IterState::Done => return None,
            IterState::Start => self.first(),
            IterState::Running { revision } => {
                if self.pager.at_end(self.direction) {
                    self.state = IterState::Done;
                    return None;
                }
                self.advance(revision)
            }
        };
        if result.is_err() {
            self.state = IterState::Done;
        }
        Some(result)
    }
}

// ============================================================================
// ROW ITERATOR
// ============================================================================

/// Rows in grid order, fetched one full-width page at a time.
pub struct RowIter<'p, 'g, G: EngineGateway + ?Sized> {
    pages: PageIter<'p, 'g, G>,
    buffered: std::vec::IntoIter<Vec<Cell>>,
}

impl<'p, 'g, G: EngineGateway + ?Sized> Iterator for RowIter<'p, 'g, G> {
    type Item = HyperCubeResult<Vec<Cell>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.buffered.next() {
                return Some(Ok(row));
            }
            match self.pages.next()? {
                Ok(mut pages) => {
                    // Exactly one full-width window is walked.
                    let matrix = pages.pop().map(|page| page.matrix).unwrap_or_default();
                    self.buffered = matrix.into_iter();
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectedRows {
    pub rows: Vec<Vec<Cell>>,
    /// More rows existed beyond the limit.
    pub truncated: bool,
}
