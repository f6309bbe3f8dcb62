// ------------------------------
// Small deterministic noise
// ------------------------------

/// Coherent 2D noise: smooth in both coordinates, deterministic for a given
/// seed, values in `[0,1)`.
pub(crate) trait NoiseField {
    fn sample(&self, x: f32, y: f32) -> f32;
}

fn hash_u32(mut x: u32) -> u32 {
    // xorshift-ish
    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb352d);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846ca68b);
    x ^= x >> 16;
    x
}

fn hash2(x: i32, y: i32, seed: u32) -> u32 {
    hash_u32(seed ^ (x as u32).wrapping_mul(0x9e3779b1) ^ (y as u32).wrapping_mul(0x85ebca6b))
}

fn rand01_from_hash(h: u32) -> f32 {
    // 24 bits, strictly below 1.0
    ((h & 0x00FF_FFFF) as f32) / 16_777_216.0
}

fn fade(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

fn value_noise2(x: f32, y: f32, seed: u32) -> f32 {
    let xi = x.floor() as i32;
    let yi = y.floor() as i32;
    let xf = x - xi as f32;
    let yf = y - yi as f32;

    let h00 = rand01_from_hash(hash2(xi, yi, seed));
    let h10 = rand01_from_hash(hash2(xi.wrapping_add(1), yi, seed));
    let h01 = rand01_from_hash(hash2(xi, yi.wrapping_add(1), seed));
    let h11 = rand01_from_hash(hash2(xi.wrapping_add(1), yi.wrapping_add(1), seed));

    let u = fade(xf);
    let v = fade(yf);

    let x0 = h00 + (h10 - h00) * u;
    let x1 = h01 + (h11 - h01) * u;
    x0 + (x1 - x0) * v
}

/// Octave-summed value noise, normalised back into `[0,1)`.
#[derive(Clone, Debug)]
pub(crate) struct ValueNoise {
    seed: u32,
    octaves: u32,
    falloff: f32,
}

impl ValueNoise {
    pub(crate) const DEFAULT_OCTAVES: u32 = 4;
    pub(crate) const DEFAULT_FALLOFF: f32 = 0.5;

    pub(crate) fn new(seed: u32) -> Self {
        Self {
            seed,
            octaves: Self::DEFAULT_OCTAVES,
            falloff: Self::DEFAULT_FALLOFF,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_octaves(mut self, octaves: u32, falloff: f32) -> Self {
        self.octaves = octaves.max(1);
        self.falloff = falloff.clamp(0.0, 1.0);
        self
    }
}

impl NoiseField for ValueNoise {
    fn sample(&self, mut x: f32, mut y: f32) -> f32 {
        let mut amp = 1.0;
        let mut sum = 0.0;
        let mut norm = 0.0;

        for i in 0..self.octaves {
            let s = self.seed.wrapping_add(i.wrapping_mul(1013));
            sum += value_noise2(x, y, s) * amp;
            norm += amp;
            x *= 2.0;
            y *= 2.0;
            amp *= self.falloff;
        }

        if norm <= 0.0 {
            return 0.0;
        }
        // Float rounding in the weighted sum can land exactly on 1.0.
        (sum / norm).clamp(0.0, 1.0 - f32::EPSILON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_in_unit_interval() {
        let n = ValueNoise::new(0xC0FFEE);
        for iy in 0..64 {
            for ix in 0..64 {
                let v = n.sample(ix as f32 * 0.37 - 5.0, iy as f32 * 0.29 - 7.0);
                assert!((0.0..1.0).contains(&v), "{v} out of range");
            }
        }
    }

    #[test]
    fn same_seed_same_values() {
        let a = ValueNoise::new(42);
        let b = ValueNoise::new(42);
        for i in 0..100 {
            let (x, y) = (i as f32 * 0.13, i as f32 * 0.71);
            assert_eq!(a.sample(x, y).to_bits(), b.sample(x, y).to_bits());
        }
    }

    #[test]
    fn different_seeds_differ_somewhere() {
        let a = ValueNoise::new(1);
        let b = ValueNoise::new(2);
        let differs = (0..50).any(|i| {
            let x = i as f32 * 0.5;
            a.sample(x, x) != b.sample(x, x)
        });
        assert!(differs);
    }

    #[test]
    fn nearby_samples_are_close() {
        let n = ValueNoise::new(9).with_octaves(1, 0.5);
        for i in 0..200 {
            let x = i as f32 * 0.05;
            let d = (n.sample(x, 1.3) - n.sample(x + 0.001, 1.3)).abs();
            assert!(d < 0.01, "jump of {d} at x={x}");
        }
    }

    #[test]
    fn lattice_points_match_hash() {
        let n = ValueNoise::new(5).with_octaves(1, 0.5);
        let expected = rand01_from_hash(hash2(3, 4, 5));
        assert_eq!(n.sample(3.0, 4.0), expected.min(1.0 - f32::EPSILON));
    }
}
