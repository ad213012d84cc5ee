use crate::error::Result;

/// A bidirectional byte channel to a remote device.
///
/// Implementations block the calling thread; there is no internal
/// buffering beyond what the operating system provides.
pub trait Transport {
    /// Discard anything pending in either direction.
    fn reset(&mut self) -> Result<()>;

    /// Block until at least one byte can be read and return how many are pending.
    fn wait(&mut self) -> Result<usize>;

    /// Read up to `buf.len()` currently available bytes. May return fewer.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Block until every byte of `data` has been accepted.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Human-readable name of the underlying channel (for logs).
    fn describe(&self) -> String;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }

    fn wait(&mut self) -> Result<usize> {
        (**self).wait()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }

    fn wait(&mut self) -> Result<usize> {
        (**self).wait()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
