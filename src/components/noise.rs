use {
    crate::errors::config_error,
    anyhow::Result,
    candle_core::{
        Device,
        Tensor,
    },
    rand::{
        rngs::StdRng,
        SeedableRng,
    },
    rand_distr::{
        Distribution,
        Normal,
    },
};

/// A source of action perturbations.
///
/// `t` is an optional position in a decay schedule (typically the number of
/// environment steps taken so far); implementations without a schedule
/// ignore it.
pub trait Noise {
    /// Draw a single noise vector of shape `(A,)`.
    fn sample(
        &mut self,
        t: Option<usize>,
    ) -> Result<Tensor>;

    /// Draw `n` noise vectors stacked into shape `(n, A)`.
    fn sample_batch(
        &mut self,
        n: usize,
        t: Option<usize>,
    ) -> Result<Tensor> {
        let rows = (0..n)
            .map(|_| self.sample(t))
            .collect::<Result<Vec<Tensor>>>()?;
        Ok(Tensor::stack(&rows, 0)?)
    }

    /// Return to the initial state, called at the start of an episode.
    fn reset(&mut self) {}
}

/// Gaussian noise with an optional linear decay of the standard deviation.
///
/// The standard deviation at schedule position `t` is
/// `max_sigma - (max_sigma - min_sigma) * min(1, t / decay_period)`.
/// Setting `min_sigma == max_sigma` gives constant noise.
pub struct GaussianNoise {
    size_action: usize,
    min_sigma: f64,
    max_sigma: f64,
    decay_period: usize,
    rng: StdRng,
    device: Device,
}
impl GaussianNoise {
    pub fn new(
        size_action: usize,
        min_sigma: f64,
        max_sigma: f64,
        decay_period: usize,
        seed: u64,
        device: &Device,
    ) -> Result<Self> {
        if !(min_sigma >= 0.0 && max_sigma >= 0.0) {
            Err(config_error(format!(
                "noise sigma must be non-negative, got min {min_sigma} and max {max_sigma}",
            )))?
        }
        if min_sigma > max_sigma {
            Err(config_error(format!(
                "noise min sigma {min_sigma} exceeds max sigma {max_sigma}",
            )))?
        }
        Ok(Self {
            size_action,
            min_sigma,
            max_sigma,
            decay_period,
            rng: StdRng::seed_from_u64(seed),
            device: device.clone(),
        })
    }

    /// Constant noise with standard deviation `sigma`.
    pub fn constant(
        size_action: usize,
        sigma: f64,
        seed: u64,
        device: &Device,
    ) -> Result<Self> {
        Self::new(size_action, sigma, sigma, 1, seed, device)
    }

    pub fn sigma(
        &self,
        t: Option<usize>,
    ) -> f64 {
        match t {
            Some(t) if self.decay_period > 0 => {
                let progress = (t as f64 / self.decay_period as f64).min(1.0);
                self.max_sigma - (self.max_sigma - self.min_sigma) * progress
            }
            _ => self.max_sigma,
        }
    }

    fn draw(
        &mut self,
        n: usize,
        t: Option<usize>,
    ) -> Result<Vec<f64>> {
        let normal = Normal::new(0.0, self.sigma(t))?;
        Ok(normal
            .sample_iter(&mut self.rng)
            .take(n * self.size_action)
            .collect())
    }
}

impl Noise for GaussianNoise {
    fn sample(
        &mut self,
        t: Option<usize>,
    ) -> Result<Tensor> {
        let values = self.draw(1, t)?;
        Ok(Tensor::from_vec(values, self.size_action, &self.device)?)
    }

    fn sample_batch(
        &mut self,
        n: usize,
        t: Option<usize>,
    ) -> Result<Tensor> {
        let values = self.draw(n, t)?;
        Ok(Tensor::from_vec(values, (n, self.size_action), &self.device)?)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigma_decays_linearly_then_stays() {
        let noise = GaussianNoise::new(2, 0.1, 0.5, 100, 0, &Device::Cpu).unwrap();
        assert_eq!(noise.sigma(None), 0.5);
        assert_eq!(noise.sigma(Some(0)), 0.5);
        assert!((noise.sigma(Some(50)) - 0.3).abs() < 1e-12);
        assert!((noise.sigma(Some(100)) - 0.1).abs() < 1e-12);
        assert!((noise.sigma(Some(10_000)) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn constant_noise_ignores_the_schedule() {
        let noise = GaussianNoise::constant(3, 0.2, 0, &Device::Cpu).unwrap();
        assert_eq!(noise.sigma(Some(0)), 0.2);
        assert_eq!(noise.sigma(Some(1_000_000)), 0.2);
    }

    #[test]
    fn shapes() {
        let mut noise = GaussianNoise::constant(3, 0.2, 0, &Device::Cpu).unwrap();
        assert_eq!(noise.sample(None).unwrap().dims(), &[3]);
        assert_eq!(noise.sample_batch(7, None).unwrap().dims(), &[7, 3]);
    }

    #[test]
    fn zero_sigma_is_silent() {
        let mut noise = GaussianNoise::constant(4, 0.0, 0, &Device::Cpu).unwrap();
        let values = noise.sample_batch(5, None).unwrap().flatten_all().unwrap().to_vec1::<f64>().unwrap();
        assert!(values.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn empirical_std_matches_sigma() {
        let mut noise = GaussianNoise::constant(1, 0.5, 3, &Device::Cpu).unwrap();
        let values = noise.sample_batch(20_000, None).unwrap().flatten_all().unwrap().to_vec1::<f64>().unwrap();
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
        assert!(mean.abs() < 0.02, "mean {mean}");
        assert!((std - 0.5).abs() < 0.02, "std {std}");
    }

    #[test]
    fn same_seed_same_noise() {
        let mut a = GaussianNoise::constant(2, 1.0, 9, &Device::Cpu).unwrap();
        let mut b = GaussianNoise::constant(2, 1.0, 9, &Device::Cpu).unwrap();
        assert_eq!(
            a.sample(None).unwrap().to_vec1::<f64>().unwrap(),
            b.sample(None).unwrap().to_vec1::<f64>().unwrap(),
        );
    }

    #[test]
    fn negative_sigma_is_rejected() {
        assert!(GaussianNoise::constant(2, -0.1, 0, &Device::Cpu).is_err());
        assert!(GaussianNoise::new(2, 0.5, 0.1, 10, 0, &Device::Cpu).is_err());
    }
}
