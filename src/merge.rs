use nalgebra::DMatrix;

/// A matrix placed at `start` in a shared coordinate frame
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub matrix: DMatrix<f64>,
    pub start: usize,
}

impl Window {
    pub fn new(matrix: DMatrix<f64>, start: usize) -> Self {
        Self { matrix, start }
    }

    pub fn width(&self) -> usize {
        self.matrix.ncols()
    }

    /// Exclusive end
    pub fn end(&self) -> usize {
        self.start + self.width()
    }
}

/// Contiguous stretch produced by merging overlapping or touching windows
#[derive(Debug, Clone, PartialEq)]
pub struct MergedWindow {
    pub window: Window,
    /// Inclusive `(start, end)` of every constituent, relative to `window.start`
    pub highlights: Vec<(usize, usize)>,
}

impl MergedWindow {
    fn from_window(window: Window) -> Self {
        let highlights = vec![(0, window.width() - 1)];
        Self { window, highlights }
    }

    fn absorb(&mut self, next: Window) {
        let current = &mut self.window;
        let rel_start = next.start - current.start;
        self.highlights.push((rel_start, rel_start + next.width() - 1));

        let overlap = current.end() - next.start;
        if overlap >= next.width() {
            return;
        }
        let extra = next.width() - overlap;
        let rows = current.matrix.nrows();
        let width = current.width();

        let mut joined: DMatrix<f64> = DMatrix::zeros(rows, width + extra);
        joined.columns_mut(0, width).copy_from(&current.matrix);
        joined
            .columns_mut(width, extra)
            .copy_from(&next.matrix.columns(overlap, extra));
        current.matrix = joined;
    }
}

/// Merge windows that overlap or are immediately adjacent.
///
/// Windows are sorted by start; a window joins the current stretch when it
/// starts no later than one past the stretch's last column, contributing only
/// its columns beyond the overlap. The stretch keeps the leftmost start.
/// Zero-width windows are ignored.
pub fn merge_windows(mut windows: Vec<Window>) -> Vec<MergedWindow> {
    windows.retain(|w| w.width() > 0);
    windows.sort_by_key(|w| w.start);

    let mut merged: Vec<MergedWindow> = Vec::with_capacity(windows.len());
    for window in windows {
        if let Some(current) = merged.last_mut() {
            if window.start <= current.window.end() {
                current.absorb(window);
                continue;
            }
        }
        merged.push(MergedWindow::from_window(window));
    }
    merged
}
