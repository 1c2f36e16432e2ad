//! Windowing collaborators. Implementations live with whatever owns the window.


/// A presentable drawing surface owning the native context.
pub trait Surface {
	fn make_current(&mut self) -> anyhow::Result<()>;
	fn swap_buffers(&mut self) -> anyhow::Result<()>;

	/// Drawable size in pixels.
	fn size(&self) -> (u32, u32);

	/// Called when the owner of the window has been resized. Surfaces that track their window
	/// on their own can ignore it.
	fn resize(&mut self, _width: u32, _height: u32) -> anyhow::Result<()> {
		Ok(())
	}
}


/// Polled once per frame, between `start_frame` and `finish_frame`.
pub trait InputPoller {
	fn poll(&mut self);
}
