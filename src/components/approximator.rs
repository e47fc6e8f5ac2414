use {
    candle_core::{
        DType,
        Device,
        Error,
        Module,
        Result,
        Tensor,
        Var,
    },
    candle_nn::{
        func,
        linear,
        sequential::seq,
        Activation,
        Sequential,
        VarBuilder,
        VarMap,
    },
    serde::{
        Deserialize,
        Serialize,
    },
};

/// A trainable function mapping batches of vectors to batches of vectors.
///
/// The agent only ever relies on `forward` and on the parameter list; two
/// approximators that are meant to track each other must return their
/// parameters in the same order and with the same shapes.
pub trait FunctionApproximator {
    fn forward(
        &self,
        xs: &Tensor,
    ) -> Result<Tensor>;

    fn parameters(&self) -> Vec<Var>;

    /// Copy all parameters from `other`.
    fn load_from(
        &self,
        other: &Self,
    ) -> Result<()>
    where
        Self: Sized,
    {
        self.track(other, 1.0)
    }

    /// Move every parameter towards the matching parameter of `source`:
    /// `param <- tau * source + (1 - tau) * param`.
    fn track(
        &self,
        source: &Self,
        tau: f64,
    ) -> Result<()>
    where
        Self: Sized,
    {
        let targets = self.parameters();
        let sources = source.parameters();
        if targets.len() != sources.len() {
            Err(Error::Msg(format!(
                "cannot track an approximator with {} parameters using one with {}",
                targets.len(),
                sources.len(),
            )))?
        }
        for (target, source) in targets.iter().zip(sources.iter()) {
            let blended = ((tau * source.as_tensor())? + ((1.0 - tau) * target.as_tensor())?)?;
            target.set(&blended)?;
        }
        Ok(())
    }
}

/// The non-linearity applied to the output layer of an [`Mlp`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputActivation {
    Identity,
    Tanh,
}

/// A fully connected network with ReLU hidden layers.
///
/// Each instance owns its own [`VarMap`], so two networks built with the
/// same dimensions start from independent random weights.
pub struct Mlp {
    network: Sequential,
    params: Vec<Var>,
    dims: Vec<(usize, usize)>,
}
impl Mlp {
    pub fn new(
        device: &Device,
        size_input: usize,
        hidden_sizes: &[usize],
        size_output: usize,
        output_activation: OutputActivation,
    ) -> Result<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F64, device);

        let widths: Vec<usize> = std::iter::once(size_input)
            .chain(hidden_sizes.iter().copied())
            .chain(std::iter::once(size_output))
            .collect();
        let dims: Vec<(usize, usize)> = widths.windows(2).map(|w| (w[0], w[1])).collect();

        let mut network = seq();
        for (i, &(in_dim, out_dim)) in dims.iter().enumerate() {
            network = network.add(linear(in_dim, out_dim, vb.pp(format!("fc{i}")))?);
            if i + 1 < dims.len() {
                network = network.add(Activation::Relu);
            }
        }
        if let OutputActivation::Tanh = output_activation {
            network = network.add(func(|xs| xs.tanh()));
        }

        let params = {
            let data = varmap
                .data()
                .lock()
                .map_err(|e| Error::Msg(e.to_string()))?;
            (0..dims.len())
                .flat_map(|i| [format!("fc{i}.weight"), format!("fc{i}.bias")])
                .map(|name| {
                    data.get(&name)
                        .cloned()
                        .ok_or_else(|| Error::Msg(format!("missing parameter {name}")))
                })
                .collect::<Result<Vec<Var>>>()?
        };

        Ok(Self {
            network,
            params,
            dims,
        })
    }

    /// The `(input, output)` size of each linear layer.
    pub fn dims(&self) -> &[(usize, usize)] {
        &self.dims
    }
}

impl FunctionApproximator for Mlp {
    fn forward(
        &self,
        xs: &Tensor,
    ) -> Result<Tensor> {
        self.network.forward(xs)
    }

    fn parameters(&self) -> Vec<Var> {
        self.params.clone()
    }
}

/// Euclidean distance between the parameters of two approximators, treating
/// all parameters as one flat vector.
pub fn parameter_distance<F: FunctionApproximator>(
    a: &F,
    b: &F,
) -> Result<f64> {
    let mut total = 0.0;
    for (x, y) in a.parameters().iter().zip(b.parameters().iter()) {
        total += (x.as_tensor() - y.as_tensor())?
            .sqr()?
            .sum_all()?
            .to_scalar::<f64>()?;
    }
    Ok(total.sqrt())
}


#[cfg(test)]
mod tests {
    use super::*;

    fn mlp() -> Mlp {
        Mlp::new(&Device::Cpu, 3, &[8, 6], 2, OutputActivation::Tanh).unwrap()
    }

    #[test]
    fn layer_layout_follows_hidden_sizes() {
        let net = mlp();
        assert_eq!(net.dims(), &[(3, 8), (8, 6), (6, 2)]);
        assert_eq!(net.parameters().len(), 6);

        let xs = Tensor::zeros((5, 3), DType::F64, &Device::Cpu).unwrap();
        assert_eq!(net.forward(&xs).unwrap().dims(), &[5, 2]);
    }

    #[test]
    fn tanh_output_is_bounded() {
        let net = mlp();
        let xs = (Tensor::randn(0.0f64, 1.0, (16, 3), &Device::Cpu).unwrap() * 100.0).unwrap();
        let out = net.forward(&xs).unwrap().flatten_all().unwrap().to_vec1::<f64>().unwrap();
        assert!(out.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn instances_are_initialized_independently() {
        let (a, b) = (mlp(), mlp());
        assert!(parameter_distance(&a, &b).unwrap() > 0.0);
    }

    #[test]
    fn load_from_makes_an_exact_copy() {
        let (a, b) = (mlp(), mlp());
        b.load_from(&a).unwrap();
        assert_eq!(parameter_distance(&a, &b).unwrap(), 0.0);

        // the copy does not alias the source
        let xs = Tensor::ones((1, 3), DType::F64, &Device::Cpu).unwrap();
        let before = b.forward(&xs).unwrap().to_vec2::<f64>().unwrap();
        for p in a.parameters() {
            p.set(&p.as_tensor().zeros_like().unwrap()).unwrap();
        }
        assert_eq!(b.forward(&xs).unwrap().to_vec2::<f64>().unwrap(), before);
    }

    #[test]
    fn soft_updates_converge_geometrically() {
        let (main, target) = (mlp(), mlp());
        let tau = 0.1;
        let initial = parameter_distance(&target, &main).unwrap();

        for n in 1..=25 {
            target.track(&main, tau).unwrap();
            let bound = (1.0 - tau).powi(n) * initial;
            let distance = parameter_distance(&target, &main).unwrap();
            assert!(distance <= bound + 1e-9, "step {n}: {distance} > {bound}");
        }
    }

    #[test]
    fn tracking_mismatched_networks_fails() {
        let a = mlp();
        let b = Mlp::new(&Device::Cpu, 3, &[8], 2, OutputActivation::Identity).unwrap();
        assert!(a.track(&b, 0.5).is_err());
    }
}
