//! Full-range RGB <-> YCbCr conversion (JFIF / DICOM YBR_FULL) on component planes.

fn clamp_sample(value: f32, max: f32) -> u16 {
    value.round().clamp(0.0, max) as u16
}

fn bounds(precision: u8) -> (f32, f32) {
    let center = (1u32 << (precision - 1)) as f32;
    let max = ((1u32 << precision) - 1) as f32;
    (center, max)
}

/// Converts three RGB planes to Y, Cb, Cr in place.
pub fn rgb_to_ycbcr(planes: &mut [Vec<u16>], precision: u8) {
    let [r_plane, g_plane, b_plane] = planes else {
        return;
    };
    let (center, max) = bounds(precision);
    for ((r, g), b) in r_plane.iter_mut().zip(g_plane.iter_mut()).zip(b_plane.iter_mut()) {
        let (red, green, blue) = (*r as f32, *g as f32, *b as f32);
        let luma = 0.299 * red + 0.587 * green + 0.114 * blue;
        let cb = -0.168736 * red - 0.331264 * green + 0.5 * blue + center;
        let cr = 0.5 * red - 0.418688 * green - 0.081312 * blue + center;
        *r = clamp_sample(luma, max);
        *g = clamp_sample(cb, max);
        *b = clamp_sample(cr, max);
    }
}

/// Converts three Y, Cb, Cr planes to RGB in place.
pub fn ycbcr_to_rgb(planes: &mut [Vec<u16>], precision: u8) {
    let [y_plane, cb_plane, cr_plane] = planes else {
        return;
    };
    let (center, max) = bounds(precision);
    for ((y, cb), cr) in y_plane.iter_mut().zip(cb_plane.iter_mut()).zip(cr_plane.iter_mut()) {
        let luma = *y as f32;
        let blue_diff = *cb as f32 - center;
        let red_diff = *cr as f32 - center;
        *y = clamp_sample(luma + 1.402 * red_diff, max);
        *cb = clamp_sample(luma - 0.344136 * blue_diff - 0.714136 * red_diff, max);
        *cr = clamp_sample(luma + 1.772 * blue_diff, max);
    }
}
