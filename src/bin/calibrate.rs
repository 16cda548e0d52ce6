//! OD 矩阵标定
//!
//! 对基线 OD 矩阵做多次高斯扰动，逐次调用 SUMO 仿真并以 NRMSE 评分，
//! 输出可供外部贝叶斯优化器使用的 (扰动, 损失) 序列。

use clap::Parser;
use od_calib::campaign::Campaign;
use od_calib::config::CampaignConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

#[derive(Debug, Parser)]
#[command(
    name = "calibrate",
    about = "Perturb an OD matrix, simulate each variant with SUMO and score it against ground truth"
)]
struct Args {
    /// 标定配置文件路径（JSON）
    #[arg(long)]
    config: PathBuf,

    /// 覆盖扰动试验次数
    #[arg(long)]
    trials: Option<usize>,

    /// 覆盖扰动随机种子
    #[arg(long)]
    seed: Option<u64>,

    /// 覆盖基准真值路段数量
    #[arg(long)]
    ground_truth_edges: Option<usize>,

    /// 只标定路径表中前 N 个不重复的 OD 对
    #[arg(long)]
    num_ods: Option<usize>,

    /// 试验结果输出路径，默认 `{output_dir}/trials.json`
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> od_calib::Result<()> {
    let mut config = CampaignConfig::from_json_file(&args.config)?;
    if let Some(n) = args.trials {
        config.trial_count = n;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(k) = args.ground_truth_edges {
        config.ground_truth_edges = k;
    }
    if let Some(n) = args.num_ods {
        config.num_ods = Some(n);
    }
    let report_path = args
        .report
        .unwrap_or_else(|| config.output_dir().join("trials.json"));

    let report = Campaign::with_sumo(config)?.run()?;
    report.write_json(&report_path)?;

    for t in &report.trials {
        match t.loss {
            Some(loss) => println!("trial {} loss={loss:.6} total_demand={:.1}", t.index, t.total_demand),
            None => println!(
                "trial {} failed: {}",
                t.index,
                t.failure.as_deref().unwrap_or("unknown")
            ),
        }
    }
    println!(
        "wrote {} trials ({} failed) to {}",
        report.trials.len(),
        report.failed_count(),
        report_path.display()
    );
    Ok(())
}
