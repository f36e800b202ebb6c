use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex, PoisonError};

use crate::foundation::core::Canvas;
use crate::foundation::error::{AudiogramError, AudiogramResult};

/// A reusable raster target.
pub struct Surface {
    id: usize,
    pixmap: vello_cpu::Pixmap,
}

impl Surface {
    /// Stable identity within its pool.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn pixmap(&self) -> &vello_cpu::Pixmap {
        &self.pixmap
    }

    pub fn pixmap_mut(&mut self) -> &mut vello_cpu::Pixmap {
        &mut self.pixmap
    }
}

/// Fixed set of surfaces handed out one task at a time.
///
/// [`SurfacePool::acquire`] blocks until a surface is free; the returned guard gives it back on
/// drop, so a surface is never held by two tasks at once.
pub struct SurfacePool {
    free: Mutex<Vec<Surface>>,
    returned: Condvar,
    capacity: usize,
}

impl SurfacePool {
    pub fn new(capacity: usize, canvas: Canvas) -> AudiogramResult<Self> {
        if capacity == 0 {
            return Err(AudiogramError::validation("surface pool needs at least one surface"));
        }
        let width: u16 = canvas
            .width
            .try_into()
            .map_err(|_| AudiogramError::render("surface width exceeds u16"))?;
        let height: u16 = canvas
            .height
            .try_into()
            .map_err(|_| AudiogramError::render("surface height exceeds u16"))?;
        let surfaces = (0..capacity)
            .map(|id| Surface {
                id,
                pixmap: vello_cpu::Pixmap::new(width, height),
            })
            .collect();
        Ok(Self {
            free: Mutex::new(surfaces),
            returned: Condvar::new(),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Surfaces not currently checked out.
    pub fn available(&self) -> usize {
        self.free.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn acquire(&self) -> SurfaceGuard<'_> {
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(surface) = free.pop() {
                return SurfaceGuard {
                    pool: self,
                    surface: Some(surface),
                };
            }
            free = self
                .returned
                .wait(free)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn release(&self, surface: Surface) {
        self.free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(surface);
        self.returned.notify_one();
    }
}

/// Exclusive use of one pooled surface.
pub struct SurfaceGuard<'a> {
    pool: &'a SurfacePool,
    surface: Option<Surface>,
}

impl Deref for SurfaceGuard<'_> {
    type Target = Surface;

    fn deref(&self) -> &Surface {
        // Only `None` after drop has run.
        self.surface.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl DerefMut for SurfaceGuard<'_> {
    fn deref_mut(&mut self) -> &mut Surface {
        self.surface.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl Drop for SurfaceGuard<'_> {
    fn drop(&mut self) {
        if let Some(surface) = self.surface.take() {
            self.pool.release(surface);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface_pool.rs"]
mod tests;
