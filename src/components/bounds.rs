use {
    crate::{
        envs::BoxSpace,
        errors::config_error,
    },
    anyhow::Result,
    candle_core::{
        Device,
        Tensor,
    },
    rand::{
        Rng,
        RngCore,
    },
};

/// The legal action box in tensor form.
///
/// Policies emit actions in `[-1, 1]` per dimension (tanh output), which
/// [`ActionBounds::rescale`] maps onto `[low, high]`.
#[derive(Clone, Debug)]
pub struct ActionBounds {
    low: Vec<f64>,
    high: Vec<f64>,
    low_t: Tensor,
    high_t: Tensor,
    half_range_t: Tensor,
    mid_t: Tensor,
}
impl ActionBounds {
    pub fn new(
        space: &BoxSpace,
        device: &Device,
    ) -> Result<Self> {
        space.validate()?;
        if space.dim() == 0 {
            Err(config_error("the action space has no dimensions"))?
        }
        let (low, high) = (space.low().to_vec(), space.high().to_vec());
        let half_range: Vec<f64> = low.iter().zip(&high).map(|(l, h)| (h - l) / 2.0).collect();
        let mid: Vec<f64> = low.iter().zip(&high).map(|(l, h)| (h + l) / 2.0).collect();
        Ok(Self {
            low_t: Tensor::new(low.as_slice(), device)?,
            high_t: Tensor::new(high.as_slice(), device)?,
            half_range_t: Tensor::new(half_range.as_slice(), device)?,
            mid_t: Tensor::new(mid.as_slice(), device)?,
            low,
            high,
        })
    }

    pub fn dim(&self) -> usize {
        self.low.len()
    }

    pub fn low(&self) -> &[f64] {
        &self.low
    }

    pub fn high(&self) -> &[f64] {
        &self.high
    }

    /// Clip every component of `actions` (shape `(A,)` or `(B, A)`) into the box.
    pub fn clip(
        &self,
        actions: &Tensor,
    ) -> Result<Tensor> {
        Ok(actions
            .broadcast_maximum(&self.low_t)?
            .broadcast_minimum(&self.high_t)?)
    }

    /// Map actions from `[-1, 1]` onto `[low, high]`.
    pub fn rescale(
        &self,
        actions: &Tensor,
    ) -> Result<Tensor> {
        Ok(actions
            .broadcast_mul(&self.half_range_t)?
            .broadcast_add(&self.mid_t)?)
    }

    /// Sample an action uniformly from the box.
    pub fn sample(
        &self,
        rng: &mut dyn RngCore,
        device: &Device,
    ) -> Result<Tensor> {
        let values: Vec<f64> = self
            .low
            .iter()
            .zip(&self.high)
            .map(|(&l, &h)| if l < h { rng.gen_range(l..=h) } else { l })
            .collect();
        Ok(Tensor::new(values.as_slice(), device)?)
    }
}


#[cfg(test)]
mod tests {
    use {
        super::*,
        rand::{
            rngs::StdRng,
            SeedableRng,
        },
    };

    fn bounds() -> ActionBounds {
        ActionBounds::new(
            &BoxSpace::new(vec![-2.0, 0.0], vec![2.0, 1.0]).unwrap(),
            &Device::Cpu,
        ).unwrap()
    }

    #[test]
    fn clip_per_dimension() {
        let actions = Tensor::new(&[[-5.0, 0.5], [1.0, 3.0]], &Device::Cpu).unwrap();
        let clipped = bounds().clip(&actions).unwrap().to_vec2::<f64>().unwrap();
        assert_eq!(clipped, vec![vec![-2.0, 0.5], vec![1.0, 1.0]]);
    }

    #[test]
    fn rescale_maps_unit_box_onto_bounds() {
        let actions = Tensor::new(&[[-1.0, -1.0], [1.0, 1.0], [0.0, 0.0]], &Device::Cpu).unwrap();
        let scaled = bounds().rescale(&actions).unwrap().to_vec2::<f64>().unwrap();
        assert_eq!(scaled, vec![vec![-2.0, 0.0], vec![2.0, 1.0], vec![0.0, 0.5]]);
    }

    #[test]
    fn uniform_samples_stay_inside() {
        let bounds = bounds();
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..200 {
            let a = bounds.sample(&mut rng, &Device::Cpu).unwrap().to_vec1::<f64>().unwrap();
            assert!((-2.0..=2.0).contains(&a[0]));
            assert!((0.0..=1.0).contains(&a[1]));
        }
    }

    #[test]
    fn empty_space_is_rejected() {
        let space = BoxSpace::new(vec![], vec![]).unwrap();
        assert!(ActionBounds::new(&space, &Device::Cpu).is_err());
    }
}
