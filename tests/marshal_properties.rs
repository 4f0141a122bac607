// Property tests for the marshaling core and the channel transform
use png_swizzle::pipeline::{
    CanonicalPixel, ChannelTransform, ColorMode, FormatError, ImageMetadata, PipelineError,
    PixelMarshaler, RowBuffers, SwapRedBlue,
};
use proptest::prelude::*;

fn mode_strategy() -> impl Strategy<Value = (ColorMode, usize)> {
    prop_oneof![
        Just((ColorMode::Grayscale, 1usize)),
        Just((ColorMode::Truecolor, 3usize)),
        Just((ColorMode::TruecolorAlpha, 4usize)),
    ]
}

/// 任意合法的 (元数据, 行字节)。
fn image_strategy() -> impl Strategy<Value = (ImageMetadata, Vec<u8>)> {
    (mode_strategy(), 1u32..24, 1u32..12).prop_flat_map(|((mode, bpp), width, height)| {
        let len = width as usize * height as usize * bpp;
        proptest::collection::vec(any::<u8>(), len).prop_map(move |bytes| {
            let metadata = ImageMetadata::new(width, height, mode).expect("metadata");
            (metadata, bytes)
        })
    })
}

fn rows_from(metadata: &ImageMetadata, bytes: &[u8]) -> RowBuffers {
    let stride = bytes.len() / metadata.height as usize;
    let mut rows = RowBuffers::allocate(stride, metadata.height as usize).expect("rows");
    rows.as_bytes_mut().copy_from_slice(bytes);
    rows
}

proptest! {
    #[test]
    fn decode_then_encode_is_identity((metadata, bytes) in image_strategy()) {
        let marshaler = PixelMarshaler::default();
        let rows = rows_from(&metadata, &bytes);

        let pixels = marshaler.decode_rows(&metadata, &rows).expect("decode");
        prop_assert_eq!(pixels.len() as u64, metadata.pixel_count());

        let mut out = RowBuffers::allocate(rows.stride(), rows.len()).expect("rows");
        marshaler.encode_rows(&metadata, &pixels, &mut out).expect("encode");
        prop_assert_eq!(out.as_bytes(), rows.as_bytes());
    }

    #[test]
    fn swap_is_an_involution(value in any::<u32>()) {
        let pixel = CanonicalPixel(value);
        prop_assert_eq!(SwapRedBlue.apply(SwapRedBlue.apply(pixel)), pixel);
    }

    #[test]
    fn swap_preserves_alpha_and_green(value in any::<u32>()) {
        let pixel = CanonicalPixel(value);
        let swapped = SwapRedBlue.apply(pixel);

        prop_assert_eq!(swapped.alpha(), pixel.alpha());
        prop_assert_eq!(swapped.green(), pixel.green());
        prop_assert_eq!(swapped.red(), pixel.blue());
        prop_assert_eq!(swapped.blue(), pixel.red());
    }

    #[test]
    fn swap_is_noop_on_gray(alpha in any::<u8>(), gray in any::<u8>()) {
        let pixel = CanonicalPixel::from_argb(alpha, gray, gray, gray);
        prop_assert_eq!(SwapRedBlue.apply(pixel), pixel);
    }

    #[test]
    fn grayscale_pipeline_is_invariant_under_swap(
        bytes in proptest::collection::vec(any::<u8>(), 1..64)
    ) {
        let width = bytes.len() as u32;
        let metadata = ImageMetadata::new(width, 1, ColorMode::Grayscale).expect("metadata");
        let marshaler = PixelMarshaler::default();
        let rows = rows_from(&metadata, &bytes);

        let mut pixels = marshaler.decode_rows(&metadata, &rows).expect("decode");
        for pixel in pixels.as_mut_slice() {
            *pixel = SwapRedBlue.apply(*pixel);
        }

        let mut out = RowBuffers::allocate(rows.stride(), 1).expect("rows");
        marshaler.encode_rows(&metadata, &pixels, &mut out).expect("encode");
        prop_assert_eq!(out.as_bytes(), &bytes[..]);
    }
}

#[test]
fn truecolor_alpha_index_mapping() {
    let (width, height) = (260u32, 5u32);
    let metadata = ImageMetadata::new(width, height, ColorMode::TruecolorAlpha).expect("metadata");
    let mut bytes = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            bytes.extend_from_slice(&[(x % 256) as u8, (y % 256) as u8, 0, 255]);
        }
    }

    let pixels = PixelMarshaler::default()
        .decode_rows(&metadata, &rows_from(&metadata, &bytes))
        .expect("decode");

    for y in 0..height {
        for x in 0..width {
            let expected = (255u32 << 24) | ((x % 256) << 16) | ((y % 256) << 8);
            assert_eq!(pixels.get(x, y), Some(CanonicalPixel(expected)));
            assert_eq!(
                pixels.as_slice()[(y * width + x) as usize],
                CanonicalPixel(expected)
            );
        }
    }
}

#[test]
fn unrecognized_mode_aborts_before_any_pixel_is_written() {
    let metadata = ImageMetadata::new(2, 2, ColorMode::Indexed).expect("metadata");
    let rows = rows_from(&metadata, &[0u8; 12]);

    let result = PixelMarshaler::default().decode_rows(&metadata, &rows);
    assert!(matches!(
        result,
        Err(PipelineError::Format(FormatError::UnsupportedColorMode(
            ColorMode::Indexed
        )))
    ));
}
