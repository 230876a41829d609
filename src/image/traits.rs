//! Read/write row-access traits implemented by the owned raster types.
//!
//! The separable filters and samplers are written against these traits so
//! they work on both single-channel buffers and per-channel planes.

pub trait ImageView {
    type Pixel: Copy;

    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn stride(&self) -> usize;

    fn row(&self, y: usize) -> &[Self::Pixel];
}

pub trait ImageViewMut: ImageView {
    fn row_mut(&mut self, y: usize) -> &mut [Self::Pixel];
}
