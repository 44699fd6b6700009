/// Decoded scene illustration, ready to be uploaded as a texture.
#[derive(Clone, PartialEq, Eq)]
pub struct SceneImage {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

impl std::fmt::Debug for SceneImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba.len())
            .finish()
    }
}

/// Holds at most one displayable handle.
/// Replacing or clearing drops the previous handle, which releases its resources.
#[derive(Debug)]
pub struct ImageSlot<H> {
    current: Option<H>,
}

impl<H> Default for ImageSlot<H> {
    fn default() -> Self {
        Self { current: None }
    }
}

impl<H> ImageSlot<H> {
    pub fn show(&mut self, handle: H) {
        self.current = Some(handle);
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&H> {
        self.current.as_ref()
    }
}
