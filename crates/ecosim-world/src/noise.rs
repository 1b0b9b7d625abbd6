//! Multi-octave coherent noise for the initial resource layout.
//!
//! Classic gradient noise over Ken Perlin's permutation table, sampled on a
//! per-seed offset so different seeds produce different layouts while the
//! same seed always produces the same one. Noise never touches the run's
//! random number generator.

use serde::{Deserialize, Serialize};

/// Shape parameters for [`NoiseParams::sample`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseParams {
    /// Base sampling frequency in noise units per cell.
    pub scale: f64,
    /// Number of octaves summed (at least 1).
    pub octaves: u32,
    /// Amplitude multiplier between successive octaves, in `[0, 1]`.
    pub persistence: f64,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            scale: 0.25,
            octaves: 1,
            persistence: 0.5,
        }
    }
}

/// Added to the grid seed before deriving the sampling offset.
const SEED_SALT: u64 = 1000;
/// Offsets wrap at this many noise units.
const OFFSET_WRAP: f64 = 10_000.0;
/// Smallest usable sampling frequency.
const MIN_SCALE: f64 = 1e-4;

const PERM: [u8; 256] = [
    151, 160, 137, 91, 90, 15, 131, 13, 201, 95, 96, 53, 194, 233, 7, 225, 140, 36, 103, 30, 69,
    142, 8, 99, 37, 240, 21, 10, 23, 190, 6, 148, 247, 120, 234, 75, 0, 26, 197, 62, 94, 252, 219,
    203, 117, 35, 11, 32, 57, 177, 33, 88, 237, 149, 56, 87, 174, 20, 125, 136, 171, 168, 68, 175,
    74, 165, 71, 134, 139, 48, 27, 166, 77, 146, 158, 231, 83, 111, 229, 122, 60, 211, 133, 230,
    220, 105, 92, 41, 55, 46, 245, 40, 244, 102, 143, 54, 65, 25, 63, 161, 1, 216, 80, 73, 209, 76,
    132, 187, 208, 89, 18, 169, 200, 196, 135, 130, 116, 188, 159, 86, 164, 100, 109, 198, 173,
    186, 3, 64, 52, 217, 226, 250, 124, 123, 5, 202, 38, 147, 118, 126, 255, 82, 85, 212, 207, 206,
    59, 227, 47, 16, 58, 17, 182, 189, 28, 42, 223, 183, 170, 213, 119, 248, 152, 2, 44, 154, 163,
    70, 221, 153, 101, 155, 167, 43, 172, 9, 129, 22, 39, 253, 19, 98, 108, 110, 79, 113, 224, 232,
    178, 185, 112, 104, 218, 246, 97, 228, 251, 34, 242, 193, 238, 210, 144, 12, 191, 179, 162,
    241, 81, 51, 145, 235, 249, 14, 239, 107, 49, 192, 214, 31, 181, 199, 106, 157, 184, 84, 204,
    176, 115, 121, 50, 45, 127, 4, 150, 254, 138, 236, 205, 93, 222, 114, 67, 29, 24, 72, 243, 141,
    128, 195, 78, 66, 215, 61, 156, 180,
];

fn perm(i: usize) -> usize {
    PERM.get(i & 255).map_or(0, |&v| usize::from(v))
}

fn fade(t: f64) -> f64 {
    t * t * t * t.mul_add(t.mul_add(6.0, -15.0), 10.0)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    t.mul_add(b - a, a)
}

fn grad(hash: usize, x: f64, y: f64) -> f64 {
    match hash & 3 {
        0 => x + y,
        1 => -x + y,
        2 => x - y,
        _ => -x - y,
    }
}

/// Lattice coordinate of `v` wrapped onto the permutation table.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn lattice(v: f64) -> usize {
    // rem_euclid keeps the value in [0, 256), so the cast is exact.
    v.floor().rem_euclid(256.0) as usize
}

/// Raw 2D gradient noise, roughly in `[-1, 1]`. Zero on lattice points.
pub fn perlin(x: f64, y: f64) -> f64 {
    let xi = lattice(x);
    let yi = lattice(y);
    let xf = x - x.floor();
    let yf = y - y.floor();
    let u = fade(xf);
    let v = fade(yf);

    let a = perm(xi);
    let b = perm(xi.wrapping_add(1));
    let aa = perm(a.wrapping_add(yi));
    let ab = perm(a.wrapping_add(yi).wrapping_add(1));
    let ba = perm(b.wrapping_add(yi));
    let bb = perm(b.wrapping_add(yi).wrapping_add(1));

    lerp(
        lerp(grad(aa, xf, yf), grad(ba, xf - 1.0, yf), u),
        lerp(grad(ab, xf, yf - 1.0), grad(bb, xf - 1.0, yf - 1.0), u),
        v,
    )
}

/// Gradient noise remapped into `[0, 1]`.
pub fn perlin01(x: f64, y: f64) -> f64 {
    f64::midpoint(perlin(x, y), 1.0).clamp(0.0, 1.0)
}

/// Per-seed sampling offset in noise space.
pub fn seed_offset(seed: u64) -> (f64, f64) {
    let salted = seed.wrapping_add(SEED_SALT);
    // Reduce before widening so the conversion to f64 is lossless.
    let s = f64::from(u32::try_from(salted % 100_000_000).unwrap_or(0));
    ((s * 0.12345) % OFFSET_WRAP, (s * 0.54321) % OFFSET_WRAP)
}

impl NoiseParams {
    /// Fractal noise at cell coordinates `(x, y)` for `seed`, in `[0, 1]`.
    ///
    /// Octave amplitudes are summed and the result divided by their total,
    /// so the output stays in the range of a single octave.
    pub fn sample(&self, seed: u64, x: f64, y: f64) -> f64 {
        let (off_x, off_y) = seed_offset(seed);
        let scale = self.scale.max(MIN_SCALE);
        let persistence = self.persistence.clamp(0.0, 1.0);

        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut total = 0.0;
        let mut norm = 0.0;
        for _ in 0..self.octaves.max(1) {
            let nx = (x + off_x) * scale * frequency;
            let ny = (y + off_y) * scale * frequency;
            total += perlin01(nx, ny) * amplitude;
            norm += amplitude;
            amplitude *= persistence;
            frequency *= 2.0;
        }

        if norm > 0.0 {
            (total / norm).clamp(0.0, 1.0)
        } else {
            0.5
        }
    }
}
