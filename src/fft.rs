//! Two-dimensional FFT helpers over `ndarray` images.
//!
//! Images are indexed `[row, column]`; the matching Fourier arrays use the
//! standard DFT layout where index `i` holds frequency `i` for
//! `i < (n + 1) / 2` and `i - n` otherwise.

use ndarray::Array2;
use rustfft::{num_complex::Complex64, FftPlanner};

/// Frequencies (cycles per unit of `spacing`) for an `n`-point DFT axis.
pub fn fftfreq(n: usize, spacing: f64) -> Vec<f64> {
    let half = (n + 1) / 2;
    (0..n)
        .map(|i| {
            let s = if i < half { i as f64 } else { i as f64 - n as f64 };
            s / (n as f64 * spacing)
        })
        .collect()
}

/// Radial frequency magnitude |k| on a 2-D grid, in inverse spacing units.
pub fn radial_frequency_grid(shape: (usize, usize), spacing: f64) -> Array2<f64> {
    let ky = fftfreq(shape.0, spacing);
    let kx = fftfreq(shape.1, spacing);
    Array2::from_shape_fn(shape, |(iy, ix)| ky[iy].hypot(kx[ix]))
}

fn transform_rows(image: &mut Array2<Complex64>, inverse: bool) {
    let (n_rows, n_cols) = image.dim();
    let mut planner = FftPlanner::new();
    let fft = if inverse {
        planner.plan_fft_inverse(n_cols)
    } else {
        planner.plan_fft_forward(n_cols)
    };
    let mut scratch = vec![Complex64::new(0.0, 0.0); fft.get_inplace_scratch_len()];
    for row in 0..n_rows {
        let mut buffer: Vec<Complex64> = image.row(row).to_vec();
        fft.process_with_scratch(&mut buffer, &mut scratch);
        for (col, value) in buffer.into_iter().enumerate() {
            image[[row, col]] = value;
        }
    }
}

fn transform_cols(image: &mut Array2<Complex64>, inverse: bool) {
    let (n_rows, n_cols) = image.dim();
    let mut planner = FftPlanner::new();
    let fft = if inverse {
        planner.plan_fft_inverse(n_rows)
    } else {
        planner.plan_fft_forward(n_rows)
    };
    let mut scratch = vec![Complex64::new(0.0, 0.0); fft.get_inplace_scratch_len()];
    for col in 0..n_cols {
        let mut buffer: Vec<Complex64> = image.column(col).to_vec();
        fft.process_with_scratch(&mut buffer, &mut scratch);
        for (row, value) in buffer.into_iter().enumerate() {
            image[[row, col]] = value;
        }
    }
}

/// Forward 2-D FFT (unnormalized).
pub fn fft2(image: &Array2<Complex64>) -> Array2<Complex64> {
    let mut out = image.clone();
    transform_rows(&mut out, false);
    transform_cols(&mut out, false);
    out
}

/// Inverse 2-D FFT, normalized by the number of elements.
pub fn ifft2(spectrum: &Array2<Complex64>) -> Array2<Complex64> {
    let mut out = spectrum.clone();
    transform_rows(&mut out, true);
    transform_cols(&mut out, true);
    let scale = 1.0 / out.len() as f64;
    out.mapv_inplace(|v| v * scale);
    out
}

/// Forward 2-D FFT of a real image.
pub fn fft2_real(image: &Array2<f64>) -> Array2<Complex64> {
    let complex = image.mapv(|v| Complex64::new(v, 0.0));
    fft2(&complex)
}

/// Inverse 2-D FFT keeping the real part.
///
/// The imaginary residue of a Hermitian spectrum is numerical noise and is
/// discarded.
pub fn ifft2_real(spectrum: &Array2<Complex64>) -> Array2<f64> {
    ifft2(spectrum).mapv(|v| v.re)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    #[test]
    fn test_fftfreq_even_and_odd() {
        assert_eq!(fftfreq(4, 1.0), vec![0.0, 0.25, -0.5, -0.25]);
        assert_eq!(fftfreq(5, 1.0), vec![0.0, 0.2, 0.4, -0.4, -0.2]);
    }

    #[test]
    fn test_fftfreq_spacing() {
        let freqs = fftfreq(4, 2.0);
        assert_relative_eq!(freqs[1], 0.125);
        assert_relative_eq!(freqs[2], -0.25);
    }

    #[test]
    fn test_impulse_has_flat_spectrum() {
        let mut image = Array2::<f64>::zeros((8, 8));
        image[[0, 0]] = 1.0;
        let spectrum = fft2_real(&image);
        for value in spectrum.iter() {
            assert_relative_eq!(value.re, 1.0, epsilon = 1e-12);
            assert_relative_eq!(value.im, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_round_trip() {
        let image = Array2::from_shape_fn((6, 10), |(iy, ix)| {
            (iy as f64 * 0.7 + 1.0) * (ix as f64 - 3.5)
        });
        let recovered = ifft2_real(&fft2_real(&image));
        for (a, b) in image.iter().zip(recovered.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_parseval() {
        let image = Array2::from_shape_fn((8, 8), |(iy, ix)| (iy * 8 + ix) as f64 * 0.1 - 2.0);
        let spectrum = fft2_real(&image);
        let real_energy: f64 = image.iter().map(|v| v * v).sum();
        let fourier_energy: f64 =
            spectrum.iter().map(|v| v.norm_sqr()).sum::<f64>() / image.len() as f64;
        assert_relative_eq!(real_energy, fourier_energy, max_relative = 1e-10);
    }

    #[test]
    fn test_dc_component_is_sum() {
        let image = Array2::from_elem((5, 7), 3.0);
        let spectrum = fft2_real(&image);
        assert_relative_eq!(spectrum[[0, 0]].re, 3.0 * 35.0, epsilon = 1e-9);
    }
}
