//! Simulated graphics context manager.
//!
//! Tracks which objects exist and rejects calls that would be invalid against a
//! real context, so ordering mistakes show up as errors in the log.

use headtrack_hal::{ContextManager, NativeWindow};

#[derive(Debug)]
pub enum SimContextError {
    /// A surface was requested before the context exists.
    NoContext,
    /// A second surface was requested while one is still bound.
    SurfaceExists,
    /// Destroy was called with nothing to destroy.
    NothingToDestroy,
}

impl core::fmt::Display for SimContextError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SimContextError::NoContext => write!(f, "no graphics context"),
            SimContextError::SurfaceExists => write!(f, "a surface is already bound"),
            SimContextError::NothingToDestroy => write!(f, "nothing to destroy"),
        }
    }
}

#[derive(Default)]
pub struct SimContext {
    context: bool,
    surface: Option<NativeWindow>,
}

impl SimContext {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContextManager for SimContext {
    type Error = SimContextError;

    fn create_context(&mut self) -> Result<(), Self::Error> {
        log::info!("sim: context created");
        self.context = true;
        Ok(())
    }

    fn create_surface(&mut self, window: &NativeWindow) -> Result<(), Self::Error> {
        if !self.context {
            return Err(SimContextError::NoContext);
        }
        if self.surface.is_some() {
            return Err(SimContextError::SurfaceExists);
        }
        log::info!(
            "sim: surface created on window {:#x} ({}x{})",
            window.handle,
            window.width,
            window.height
        );
        self.surface = Some(*window);
        Ok(())
    }

    fn destroy_surface(&mut self) -> Result<(), Self::Error> {
        let window = self.surface.take().ok_or(SimContextError::NothingToDestroy)?;
        log::info!("sim: surface on window {:#x} destroyed", window.handle);
        Ok(())
    }

    fn destroy_context(&mut self) -> Result<(), Self::Error> {
        if !self.context {
            return Err(SimContextError::NothingToDestroy);
        }
        log::info!("sim: context destroyed");
        self.context = false;
        Ok(())
    }
}
