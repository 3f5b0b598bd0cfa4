// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Step-driven training with Burn's DataLoader and Adam.
//
//   - one DataLoader per epoch, built from that epoch's sample
//     of the data; the epoch ends when its iterator runs dry
//   - a global step counter, starting at 0, drives both the
//     progress report (every print_steps) and snapshots
//     (every save_steps, so step_0 is saved as well)
//   - gradients are clipped element-wise by Adam itself
//   - after the last epoch a `step_final` snapshot is written
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArrayDevice, Autodiff, NdArray},
    data::dataloader::DataLoaderBuilder,
    grad_clipping::GradientClippingConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::time::{Duration, Instant};

use crate::application::config::TrainConfig;
use crate::data::{batcher::DialogueBatcher, dataset::DialogueDataset};
use crate::domain::traits::ExampleSource;
use crate::infra::checkpoint::{init_from_checkpoint, init_from_pretrain_model, CheckpointManager};
use crate::infra::embedding_init::EmbeddingMatrix;
use crate::infra::metrics::{MetricsLogger, StepMetrics};
use crate::ml::device::{check_device, DeviceKind};
use crate::ml::model::{AdeNet, AdeNetConfig};

type CpuBackend = Autodiff<NdArray>;

/// What a finished run reports back
#[derive(Debug, Clone)]
pub struct TrainSummary {
    /// Optimisation steps taken across all epochs
    pub steps:     usize,
    /// Loss of the last batch (NaN if no batch ran)
    pub last_loss: f64,
    pub duration:  Duration,
}

/// Everything the loop writes to besides the model itself
pub struct TrainOutputs {
    pub checkpoints: CheckpointManager,
    pub metrics:     MetricsLogger,
}

pub fn run_training<S: ExampleSource>(
    cfg:      &TrainConfig,
    source:   &S,
    word_emb: Option<EmbeddingMatrix>,
    outputs:  TrainOutputs,
) -> Result<TrainSummary> {
    match check_device(cfg.use_gpu)? {
        DeviceKind::Gpu => run_on_gpu(cfg, source, word_emb, outputs),
        DeviceKind::Cpu => {
            tracing::info!("Using NdArray CPU device");
            train_loop::<CpuBackend, S>(cfg, source, word_emb, outputs, NdArrayDevice::Cpu)
        }
    }
}

#[cfg(feature = "gpu")]
fn run_on_gpu<S: ExampleSource>(
    cfg:      &TrainConfig,
    source:   &S,
    word_emb: Option<EmbeddingMatrix>,
    outputs:  TrainOutputs,
) -> Result<TrainSummary> {
    use burn::backend::{wgpu::WgpuDevice, Wgpu};

    let device = WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop::<Autodiff<Wgpu>, S>(cfg, source, word_emb, outputs, device)
}

#[cfg(not(feature = "gpu"))]
fn run_on_gpu<S: ExampleSource>(
    _cfg:      &TrainConfig,
    _source:   &S,
    _word_emb: Option<EmbeddingMatrix>,
    _outputs:  TrainOutputs,
) -> Result<TrainSummary> {
    anyhow::bail!("GPU backend is not compiled in")
}

pub fn train_loop<B: AutodiffBackend, S: ExampleSource>(
    cfg:      &TrainConfig,
    source:   &S,
    word_emb: Option<EmbeddingMatrix>,
    outputs:  TrainOutputs,
    device:   B::Device,
) -> Result<TrainSummary> {
    B::seed(cfg.random_seed);

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = AdeNetConfig::from_train_config(cfg);
    let mut model: AdeNet<B> = model_cfg.init(&device);
    let loss_fn = model_cfg.loss();
    tracing::info!(
        "Model ready: vocab={}, emb={}, hidden={}, loss={}, {} parameters",
        cfg.vocab_size, cfg.emb_size, cfg.hidden_size, cfg.loss_type, model.num_params()
    );

    // ── Adam with gradient clipping by value ──────────────────────────────────
    let optim_cfg = AdamConfig::new()
        .with_grad_clipping(Some(GradientClippingConfig::Value(cfg.grad_clip)));
    let mut optim = optim_cfg.init();

    // ── Warm start ────────────────────────────────────────────────────────────
    if let Some(dir) = &cfg.init_from_checkpoint {
        (model, optim) = init_from_checkpoint(dir, model, optim, &device)?;
    }
    if let Some(dir) = &cfg.init_from_pretrain_model {
        model = init_from_pretrain_model(dir, model, &device)?;
    }
    if let Some(matrix) = word_emb {
        tracing::info!("Loading word embedding init {:?} ...", matrix.shape());
        let table = Tensor::<B, 1>::from_floats(matrix.values.as_slice(), &device)
            .reshape(matrix.shape());
        model = model.with_word_embedding(table)?;
        tracing::info!("Word embedding initialised");
    }

    let TrainOutputs { checkpoints, metrics } = outputs;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    let begin          = Instant::now();
    let mut window     = Instant::now();
    let mut steps      = 0usize;
    let mut last_loss  = f64::NAN;

    for epoch in 0..cfg.epoch {
        let examples = source.epoch_examples(epoch);
        if examples.is_empty() {
            tracing::warn!("Epoch {} has no examples, skipping", epoch);
            continue;
        }
        tracing::debug!("Epoch {} starts with {} examples", epoch, examples.len());

        let loader = DataLoaderBuilder::new(DialogueBatcher::<B>::new(device.clone()))
            .batch_size(cfg.batch_size)
            .shuffle(cfg.random_seed.wrapping_add(epoch as u64))
            .num_workers(1)
            .build(DialogueDataset::new(examples));

        let mut window_loss  = 0.0f64;
        let mut window_steps = 0usize;

        for batch in loader.iter() {
            let logits = model.forward(
                batch.context_ids,
                batch.context_lens,
                batch.response_ids,
                batch.response_lens,
            );
            let loss = loss_fn.forward(logits, batch.labels);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            window_loss  += loss_val;
            window_steps += 1;
            last_loss     = loss_val;

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.learning_rate, model, grads);

            if steps % cfg.print_steps == 0 {
                let elapsed = window.elapsed().as_secs_f64().max(f64::EPSILON);
                let report  = StepMetrics {
                    epoch,
                    step:          steps,
                    avg_loss:      window_loss / window_steps as f64,
                    steps_per_sec: window_steps as f64 / elapsed,
                };
                println!(
                    "{} epoch: {}, step: {}, avg loss {:.6}, speed: {:.6} steps/s",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                    report.epoch, report.step, report.avg_loss, report.steps_per_sec,
                );
                metrics.log(&report)?;

                window_loss  = 0.0;
                window_steps = 0;
                window       = Instant::now();
            }

            if steps % cfg.save_steps == 0 {
                save_snapshots(&checkpoints, &model, &optim, &model_cfg, &format!("step_{steps}"))?;
            }

            steps += 1;
        }

        tracing::debug!("Epoch {} finished, {} steps so far", epoch, steps);
    }

    save_snapshots(&checkpoints, &model, &optim, &model_cfg, "step_final")?;

    let summary = TrainSummary { steps, last_loss, duration: begin.elapsed() };

    if cfg.enable_ce {
        for line in ce_lines(visible_cards(), &summary) {
            println!("{line}");
        }
    }

    tracing::info!("Training complete: {} steps in {:.1?}", summary.steps, summary.duration);
    Ok(summary)
}

fn save_snapshots<B, O>(
    checkpoints: &CheckpointManager,
    model:       &AdeNet<B>,
    optim:       &O,
    model_cfg:   &AdeNetConfig,
    name:        &str,
) -> Result<()>
where
    B: AutodiffBackend,
    O: Optimizer<AdeNet<B>, B>,
{
    checkpoints.save_checkpoint(model, optim, name)?;
    checkpoints.save_params(model, model_cfg, name)?;
    Ok(())
}

/// KPI lines read by the continuous-evaluation harness
fn ce_lines(cards: usize, summary: &TrainSummary) -> Vec<String> {
    vec![
        format!("test_card_num {}", cards),
        format!("kpis\ttrain_duration_card{}\t{}", cards, summary.duration.as_secs_f64()),
        format!("kpis\ttrain_loss_card{}\t{:.6}", cards, summary.last_loss),
    ]
}

/// Number of entries in CUDA_VISIBLE_DEVICES, as CE dashboards key on it
fn visible_cards() -> usize {
    cards_from(std::env::var("CUDA_VISIBLE_DEVICES").ok().as_deref())
}

fn cards_from(value: Option<&str>) -> usize {
    match value {
        Some(v) if !v.trim().is_empty() => v.split(',').count(),
        _ => 0,
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::reader::DataProcessor;
    use crate::domain::dialogue_pair::DialoguePair;
    use std::{io::Write, path::Path};

    struct VecSource(Vec<DialoguePair>);

    impl ExampleSource for VecSource {
        fn num_examples(&self) -> usize { self.0.len() }
        fn epoch_examples(&self, _epoch: usize) -> Vec<DialoguePair> { self.0.clone() }
    }

    fn toy_source() -> VecSource {
        VecSource(vec![
            DialoguePair::new(vec![1, 2, 3], vec![4, 5], 1),
            DialoguePair::new(vec![6, 7], vec![8], 0),
            DialoguePair::new(vec![9], vec![10, 11, 12], 1),
            DialoguePair::new(vec![2, 4, 6, 8], vec![1], 0),
            DialoguePair::new(vec![3, 5], vec![7, 9], 1),
            DialoguePair::new(vec![11], vec![13], 0),
        ])
    }

    fn toy_config(out: &Path) -> TrainConfig {
        TrainConfig {
            vocab_size:      16,
            emb_size:        8,
            hidden_size:     8,
            batch_size:      2,
            epoch:           2,
            print_steps:     2,
            save_steps:      4,
            save_model_path: out.to_path_buf(),
            ..TrainConfig::default()
        }
    }

    fn outputs(cfg: &TrainConfig) -> TrainOutputs {
        TrainOutputs {
            checkpoints: CheckpointManager::from_config(cfg),
            metrics:     MetricsLogger::new(&cfg.save_model_path).unwrap(),
        }
    }

    #[test]
    fn test_short_run_writes_snapshots() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = toy_config(tmp.path());

        let summary = train_loop::<CpuBackend, _>(
            &cfg, &toy_source(), None, outputs(&cfg), NdArrayDevice::Cpu,
        ).unwrap();

        // 6 examples / batch 2 = 3 steps per epoch, 2 epochs
        assert_eq!(summary.steps, 6);
        assert!(summary.last_loss.is_finite());

        let ckpt = tmp.path().join("checkpoints");
        let params = tmp.path().join("params");
        for name in ["step_0", "step_4", "step_final"] {
            assert!(ckpt.join(name).join("model.mpk.gz").exists(), "{name}");
            assert!(ckpt.join(name).join("optimizer.mpk.gz").exists(), "{name}");
            assert!(params.join(name).join("model_config.json").exists(), "{name}");
        }
        assert!(!ckpt.join("step_2").exists());

        // Reports at steps 0, 2, 4 plus the header
        let csv = std::fs::read_to_string(tmp.path().join("metrics.csv")).unwrap();
        assert_eq!(csv.lines().count(), 4);
    }

    #[test]
    fn test_resume_from_checkpoint_and_embedding_init() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = toy_config(tmp.path());
        train_loop::<CpuBackend, _>(&cfg, &toy_source(), None, outputs(&cfg), NdArrayDevice::Cpu)
            .unwrap();

        let resumed_out = tmp.path().join("resumed");
        let resumed = TrainConfig {
            epoch:                1,
            init_from_checkpoint: Some(tmp.path().join("checkpoints").join("step_final")),
            ..toy_config(&resumed_out)
        };
        let emb = EmbeddingMatrix { rows: 16, cols: 8, values: vec![0.01; 16 * 8] };

        let summary = train_loop::<CpuBackend, _>(
            &resumed, &toy_source(), Some(emb), outputs(&resumed), NdArrayDevice::Cpu,
        ).unwrap();
        assert_eq!(summary.steps, 3);
        assert!(resumed_out.join("params").join("step_final").exists());
    }

    #[test]
    fn test_wrong_embedding_shape_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = toy_config(tmp.path());
        let emb = EmbeddingMatrix { rows: 4, cols: 8, values: vec![0.0; 32] };
        let result = train_loop::<CpuBackend, _>(
            &cfg, &toy_source(), Some(emb), outputs(&cfg), NdArrayDevice::Cpu,
        );
        assert!(result.is_err());
    }

    fn embedding_of(param_dir: &Path, cfg: &TrainConfig) -> Vec<f32> {
        let device = NdArrayDevice::Cpu;
        let fresh: AdeNet<NdArray> = AdeNetConfig::from_train_config(cfg).init(&device);
        init_from_pretrain_model(param_dir, fresh, &device)
            .unwrap()
            .word_embedding
            .weight
            .val()
            .into_data()
            .to_vec()
            .unwrap()
    }

    #[test]
    fn test_warm_start_from_params() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = toy_config(tmp.path());
        train_loop::<CpuBackend, _>(&cfg, &toy_source(), None, outputs(&cfg), NdArrayDevice::Cpu)
            .unwrap();
        let trained = tmp.path().join("params").join("step_final");

        // No epochs: step_final of the new run is exactly the loaded params.
        let warm_out = tmp.path().join("warm");
        let warm = TrainConfig {
            epoch:                    0,
            init_from_pretrain_model: Some(trained.clone()),
            ..toy_config(&warm_out)
        };
        let summary = train_loop::<CpuBackend, _>(
            &warm, &toy_source(), None, outputs(&warm), NdArrayDevice::Cpu,
        ).unwrap();
        assert_eq!(summary.steps, 0);

        // Params only: no optimizer state is needed or written alongside.
        assert!(!trained.join("optimizer.mpk.gz").exists());
        let saved = warm_out.join("params").join("step_final");
        assert_eq!(embedding_of(&saved, &warm), embedding_of(&trained, &cfg));
    }

    #[test]
    fn test_sampled_run_through_reader() {
        let tmp  = tempfile::tempdir().unwrap();
        let data = tmp.path().join("train.ids");
        let mut f = std::fs::File::create(&data).unwrap();
        for i in 0..20u32 {
            writeln!(f, "{} {}\t{}\t{}", i % 15 + 1, i % 7 + 1, i % 11 + 1, i % 2).unwrap();
        }
        drop(f);

        let cfg = TrainConfig { sample_pro: 0.5, ..toy_config(tmp.path()) };
        let source = DataProcessor::new(&data, cfg.max_seq_len, cfg.batch_size, cfg.vocab_size)
            .unwrap()
            .with_sampling(cfg.sample_pro, cfg.random_seed);
        assert_eq!(source.num_examples(), 20);

        // Every epoch runs ceil(kept / batch_size) steps over its own sample.
        let expected: usize = (0..cfg.epoch)
            .map(|e| source.epoch_examples(e).len().div_ceil(cfg.batch_size))
            .sum();
        assert!(expected < 20);

        let summary = train_loop::<CpuBackend, _>(
            &cfg, &source, None, outputs(&cfg), NdArrayDevice::Cpu,
        ).unwrap();
        assert_eq!(summary.steps, expected);
        assert!(summary.last_loss.is_finite());
    }

    #[test]
    fn test_ce_lines() {
        let summary = TrainSummary {
            steps:     6,
            last_loss: 0.5,
            duration:  Duration::from_millis(1500),
        };
        assert_eq!(
            ce_lines(2, &summary),
            vec![
                "test_card_num 2".to_string(),
                "kpis\ttrain_duration_card2\t1.5".to_string(),
                "kpis\ttrain_loss_card2\t0.500000".to_string(),
            ]
        );
    }

    #[test]
    fn test_card_count() {
        assert_eq!(cards_from(None), 0);
        assert_eq!(cards_from(Some("")), 0);
        assert_eq!(cards_from(Some("0")), 1);
        assert_eq!(cards_from(Some("0,1,3")), 3);
    }
}
