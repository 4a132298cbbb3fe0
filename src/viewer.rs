//! Overlay state for inspecting images attached to assistant answers.

pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 3.0;
pub const ZOOM_STEP: f64 = 0.25;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ImageViewer {
    #[default]
    Closed,
    Open {
        images: Vec<String>,
        index: usize,
        zoom: f64,
    },
}

/// Two decimal places, so repeated steps never drift.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl ImageViewer {
    pub fn is_open(&self) -> bool {
        matches!(self, ImageViewer::Open { .. })
    }

    /// Opens on `index`. An empty set leaves the viewer closed; an out of
    /// range index is clamped to the last image.
    pub fn open(&mut self, images: Vec<String>, index: usize) {
        if images.is_empty() {
            *self = ImageViewer::Closed;
            return;
        }
        let index = index.min(images.len() - 1);
        *self = ImageViewer::Open {
            images,
            index,
            zoom: MIN_ZOOM,
        };
    }

    pub fn close(&mut self) {
        *self = ImageViewer::Closed;
    }

    pub fn next(&mut self) {
        if let ImageViewer::Open {
            images,
            index,
            zoom,
        } = self
        {
            *index = (*index + 1) % images.len();
            *zoom = MIN_ZOOM;
        }
    }

    pub fn prev(&mut self) {
        if let ImageViewer::Open {
            images,
            index,
            zoom,
        } = self
        {
            *index = (*index + images.len() - 1) % images.len();
            *zoom = MIN_ZOOM;
        }
    }

    pub fn zoom_in(&mut self) {
        if let ImageViewer::Open { zoom, .. } = self {
            *zoom = MAX_ZOOM.min(round2(*zoom + ZOOM_STEP));
        }
    }

    pub fn zoom_out(&mut self) {
        if let ImageViewer::Open { zoom, .. } = self {
            *zoom = MIN_ZOOM.max(round2(*zoom - ZOOM_STEP));
        }
    }

    pub fn reset_zoom(&mut self) {
        if let ImageViewer::Open { zoom, .. } = self {
            *zoom = MIN_ZOOM;
        }
    }

    pub fn current(&self) -> Option<&str> {
        match self {
            ImageViewer::Open { images, index, .. } => images.get(*index).map(String::as_str),
            ImageViewer::Closed => None,
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            ImageViewer::Open { index, .. } => Some(*index),
            ImageViewer::Closed => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ImageViewer::Open { images, .. } => images.len(),
            ImageViewer::Closed => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Prev/next only make sense with more than one image.
    pub fn has_navigation(&self) -> bool {
        self.len() > 1
    }

    pub fn zoom(&self) -> Option<f64> {
        match self {
            ImageViewer::Open { zoom, .. } => Some(*zoom),
            ImageViewer::Closed => None,
        }
    }

    pub fn zoom_percent(&self) -> Option<u32> {
        self.zoom().map(|z| (z * 100.0).round() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn images(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("/api/catalog/image?path={i}.png")).collect()
    }

    #[test]
    fn next_wraps_back_to_start() {
        let mut viewer = ImageViewer::default();
        viewer.open(images(4), 2);
        for _ in 0..4 {
            viewer.next();
        }
        assert_eq!(viewer.index(), Some(2));

        viewer.open(images(4), 3);
        viewer.next();
        assert_eq!(viewer.index(), Some(0));
    }

    #[test]
    fn prev_from_first_goes_to_last() {
        let mut viewer = ImageViewer::default();
        viewer.open(images(5), 0);
        viewer.prev();
        assert_eq!(viewer.index(), Some(4));
        assert_eq!(viewer.current(), Some("/api/catalog/image?path=4.png"));
    }

    #[test]
    fn zoom_is_clamped() {
        let mut viewer = ImageViewer::default();
        viewer.open(images(1), 0);

        viewer.zoom_out();
        assert_eq!(viewer.zoom(), Some(1.0));

        for _ in 0..8 {
            viewer.zoom_in();
        }
        assert_eq!(viewer.zoom(), Some(3.0));
        viewer.zoom_in();
        viewer.zoom_in();
        assert_eq!(viewer.zoom(), Some(3.0));
        assert_eq!(viewer.zoom_percent(), Some(300));

        viewer.zoom_out();
        assert_eq!(viewer.zoom(), Some(2.75));
        viewer.reset_zoom();
        assert_eq!(viewer.zoom(), Some(1.0));
    }

    #[test]
    fn navigation_resets_zoom() {
        let mut viewer = ImageViewer::default();
        viewer.open(images(3), 1);
        viewer.zoom_in();
        viewer.zoom_in();
        assert_eq!(viewer.zoom(), Some(1.5));
        viewer.next();
        assert_eq!(viewer.zoom(), Some(1.0));
        viewer.zoom_in();
        viewer.prev();
        assert_eq!(viewer.zoom(), Some(1.0));
    }

    #[test]
    fn open_and_close() {
        let mut viewer = ImageViewer::default();
        viewer.open(Vec::new(), 0);
        assert!(!viewer.is_open());

        viewer.open(images(2), 9);
        assert_eq!(viewer.index(), Some(1));
        assert!(viewer.has_navigation());

        viewer.close();
        assert_eq!(viewer, ImageViewer::Closed);
        viewer.next();
        viewer.zoom_in();
        assert_eq!(viewer, ImageViewer::Closed);
        assert_eq!(viewer.zoom(), None);
    }

    #[test]
    fn single_image_has_no_navigation() {
        let mut viewer = ImageViewer::default();
        viewer.open(images(1), 0);
        assert!(!viewer.has_navigation());
        viewer.next();
        assert_eq!(viewer.index(), Some(0));
    }
}
