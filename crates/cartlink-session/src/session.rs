use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::device::Flashcart;
use crate::error::Result;
use crate::listen::{listen, ListenObserver, ListenOutcome};
use crate::upload::{UploadProgress, UploadReport};

/// Exclusive ownership of one flashcart from bind until drop.
///
/// The transport is released when the session is dropped, whichever way the
/// caller leaves: finished, failed, or cancelled.
pub struct Session<C: Flashcart> {
    cart: C,
    identity: String,
}

impl<C: Flashcart> Session<C> {
    /// Take ownership of `cart`, discarding anything stale in its buffers.
    pub fn bind(mut cart: C) -> Result<Self> {
        cart.reset()?;
        let identity = cart.identify();
        info!(device = %identity, "session bound");
        Ok(Self { cart, identity })
    }

    /// Take ownership of a cart whose program is already running.
    ///
    /// Nothing is reset or written. Pending input is the program's output
    /// and clearing it could leave the stream mid-packet.
    pub fn attach(cart: C) -> Self {
        let identity = cart.identify();
        info!(device = %identity, "session attached");
        Self { cart, identity }
    }

    /// Identity reported by the device at bind time.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Upload and start an image.
    pub fn boot(
        &mut self,
        image: &[u8],
        progress: &mut dyn FnMut(&UploadProgress),
    ) -> Result<UploadReport> {
        self.cart.boot_rom(image, progress)
    }

    /// Stay attached and hand device output to `observer`.
    pub fn listen<O: ListenObserver + ?Sized>(
        &mut self,
        observer: &mut O,
        cancel: &CancelToken,
    ) -> Result<ListenOutcome> {
        listen(&mut self.cart, observer, cancel)
    }

    /// Borrow the bound device.
    pub fn get_ref(&self) -> &C {
        &self.cart
    }
}

impl<C: Flashcart> Drop for Session<C> {
    fn drop(&mut self) {
        debug!(device = %self.identity, "session closed");
    }
}
