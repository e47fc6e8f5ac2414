use {
    super::Noise,
    anyhow::Result,
    candle_core::{
        DType,
        Device,
        Tensor,
    },
    rand::{
        rngs::StdRng,
        SeedableRng,
    },
    rand_distr::{
        Distribution,
        StandardNormal,
    },
};

/// Ornstein-Uhlenbeck process noise.
///
/// Temporally correlated, so consecutive samples drift together. Has no
/// decay schedule.
pub struct OuNoise {
    mu: f64,
    theta: f64,
    sigma: f64,
    initial: Tensor,
    state: Tensor,
    rng: StdRng,
}
impl OuNoise {
    pub fn new(
        mu: f64,
        theta: f64,
        sigma: f64,
        size_action: usize,
        seed: u64,
        device: &Device,
    ) -> Result<Self> {
        let initial = (Tensor::ones(size_action, DType::F64, device)? * mu)?;
        Ok(Self {
            mu,
            theta,
            sigma,
            state: initial.clone(),
            initial,
            rng: StdRng::seed_from_u64(seed),
        })
    }
}

impl Noise for OuNoise {
    fn sample(
        &mut self,
        _t: Option<usize>,
    ) -> Result<Tensor> {
        let values: Vec<f64> = StandardNormal
            .sample_iter(&mut self.rng)
            .take(self.state.elem_count())
            .collect();
        let rand = Tensor::from_vec(values, self.state.dims(), self.state.device())?;
        let dx = ((self.theta * (self.mu - &self.state)?)? + (self.sigma * rand)?)?;
        self.state = (&self.state + dx)?;
        Ok(self.state.clone())
    }

    fn reset(&mut self) {
        self.state = self.initial.clone();
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_returns_to_mu() {
        let mut noise = OuNoise::new(0.3, 0.15, 0.2, 2, 0, &Device::Cpu).unwrap();
        for _ in 0..10 {
            noise.sample(None).unwrap();
        }
        noise.reset();
        assert_eq!(noise.state.to_vec1::<f64>().unwrap(), vec![0.3, 0.3]);
    }

    #[test]
    fn without_sigma_the_process_decays_to_mu() {
        let mut noise = OuNoise::new(0.0, 0.5, 0.0, 3, 0, &Device::Cpu).unwrap();
        noise.state = Tensor::new(&[1.0, -2.0, 4.0], &Device::Cpu).unwrap();

        let first = noise.sample(None).unwrap().to_vec1::<f64>().unwrap();
        assert_eq!(first, vec![0.5, -1.0, 2.0]);

        for _ in 0..60 {
            noise.sample(None).unwrap();
        }
        let last = noise.sample(None).unwrap().to_vec1::<f64>().unwrap();
        assert!(last.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn same_seed_same_path() {
        let mut a = OuNoise::new(0.0, 0.15, 0.2, 2, 5, &Device::Cpu).unwrap();
        let mut b = OuNoise::new(0.0, 0.15, 0.2, 2, 5, &Device::Cpu).unwrap();
        for _ in 0..5 {
            assert_eq!(
                a.sample(None).unwrap().to_vec1::<f64>().unwrap(),
                b.sample(None).unwrap().to_vec1::<f64>().unwrap(),
            );
        }
        let mut c = OuNoise::new(0.0, 0.15, 0.2, 2, 6, &Device::Cpu).unwrap();
        assert_ne!(
            a.sample(None).unwrap().to_vec1::<f64>().unwrap(),
            c.sample(None).unwrap().to_vec1::<f64>().unwrap(),
        );
    }

    #[test]
    fn batch_stacks_successive_samples() {
        let mut noise = OuNoise::new(0.0, 0.15, 0.2, 2, 0, &Device::Cpu).unwrap();
        assert_eq!(noise.sample_batch(4, None).unwrap().dims(), &[4, 2]);
    }
}
