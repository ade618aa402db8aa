use anyhow::{bail, Context};
use clap::Parser;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use pixscan_core::prelude::*;

#[derive(Parser)]
#[command(
    name = "pixscan",
    about = "Broadcasting scan engine for tensor-valued images",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show sample types and the promotion table
    Info,
    /// Run the mixed-shape, mixed-type broadcast scenario and check its output
    Demo,
    /// Time broadcasting add, sequential against parallel
    Bench {
        /// Square image sizes to benchmark (comma-separated)
        #[arg(long, default_value = "64,128,256")]
        sizes: String,
        /// Worker threads for the parallel run (rayon default if omitted)
        #[arg(long)]
        threads: Option<usize>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Info => cmd_info(),
        Commands::Demo => cmd_demo(),
        Commands::Bench { sizes, threads } => cmd_bench(&sizes, threads),
    }
}

fn cmd_info() -> anyhow::Result<()> {
    println!("pixscan v{}\n", env!("CARGO_PKG_VERSION"));

    println!("Sample types");
    for dtype in DType::ALL {
        let kind = if dtype.is_float() {
            "float"
        } else if dtype.is_signed() {
            "signed"
        } else {
            "unsigned"
        };
        println!("  {:<4} {} bytes  {}", dtype.to_string(), dtype.element_size(), kind);
    }

    println!("\nPromotion");
    print!("{}", promotion_table());
    Ok(())
}

/// Working type for every pair of sample types, one row per lhs type.
fn promotion_table() -> String {
    let mut table = format!("{:>5}", "");
    for b in DType::ALL {
        table.push_str(&format!("{:>5}", b.to_string()));
    }
    table.push('\n');
    for a in DType::ALL {
        table.push_str(&format!("{:>5}", a.to_string()));
        for b in DType::ALL {
            table.push_str(&format!("{:>5}", DType::promote(a, b).to_string()));
        }
        table.push('\n');
    }
    table
}

fn demo_pixel(img: &Image, coords: &[usize]) -> anyhow::Result<Vec<f64>> {
    (0..img.tensor_elements())
        .map(|k| Ok(img.tensor_element(k)?.at(coords)?.as_f64()?))
        .collect()
}

fn cmd_demo() -> anyhow::Result<()> {
    let failures = run_demo()?;
    if failures > 0 {
        bail!("{failures} demo check(s) failed");
    }
    println!("\nall checks passed");
    Ok(())
}

/// Run the broadcast scenario, print each check and return the failure count.
fn run_demo() -> anyhow::Result<usize> {
    let mut lhs = Image::new(&[50, 80, 30], 3, DType::U8)?;
    lhs.reshape_tensor(Tensor::new(TensorShape::SymmetricMatrix, 2, 2)?)?;
    lhs.set(1u8)?;
    lhs.tensor_element(2)?.at(&[3, 4, 5])?.set(9u8)?;

    let mut rhs = Image::new(&[50, 1, 30], 2, DType::I16)?;
    rhs.reshape_tensor(Tensor::new(TensorShape::DiagonalMatrix, 2, 2)?)?;
    rhs.set(4i16)?;
    rhs.tensor_element(0)?.at(&[2, 0, 3])?.set(6i16)?;

    println!("lhs: {lhs:?}");
    println!("rhs: {rhs:?}");

    let start = Instant::now();
    let out = (&lhs + &rhs).context("scan failed")?;
    println!("out: {out:?}  ({:.2}ms)\n", start.elapsed().as_secs_f64() * 1000.0);

    let mut failures = 0;
    let mut check = |what: &str, ok: bool| {
        println!("  [{}] {what}", if ok { "x" } else { " " });
        if !ok {
            failures += 1;
        }
    };

    check("extents {50, 80, 30}", out.dimensions().dims() == [50, 80, 30]);
    check(
        "tensor 2x2 column-major matrix",
        out.tensor_shape() == TensorShape::ColMajorMatrix
            && out.tensor_rows() == 2
            && out.tensor_columns() == 2,
    );
    check("sample type i16", out.dtype() == DType::I16);

    let expected: [(&[usize], [f64; 4]); 3] = [
        (&[0, 0, 0], [5.0, 1.0, 1.0, 5.0]),
        (&[3, 4, 5], [5.0, 9.0, 9.0, 5.0]),
        (&[2, 10, 3], [7.0, 1.0, 1.0, 5.0]),
    ];
    for (coords, want) in expected {
        let got = demo_pixel(&out, coords)?;
        check(&format!("pixel {coords:?} = {got:?}"), got == want);
    }

    Ok(failures)
}

fn time_add(a: &Image, b: &Image, options: &ScanOptions, iters: usize) -> anyhow::Result<f64> {
    let start = Instant::now();
    for _ in 0..iters {
        a.scan_with(b, Add, options)?;
    }
    Ok(start.elapsed().as_secs_f64() / iters as f64)
}

fn parse_sizes(sizes_str: &str) -> Vec<usize> {
    sizes_str
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .filter(|&n| n > 0)
        .collect()
}

fn cmd_bench(sizes_str: &str, threads: Option<usize>) -> anyhow::Result<()> {
    let sizes = parse_sizes(sizes_str);
    if sizes.is_empty() {
        bail!("no valid sizes in {sizes_str:?}");
    }

    let pool = match threads {
        Some(n) => Some(
            rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .context("failed to build thread pool")?,
        ),
        None => None,
    };
    let workers = pool
        .as_ref()
        .map_or_else(rayon::current_num_threads, |p| p.current_num_threads());

    println!("=== pixscan add benchmark (u8 3x3 symmetric + f32 broadcast row) ===");
    println!("threads: {workers}\n");
    println!("{:<14} {:>16} {:>14} {:>9} {:>12}", "Size", "Sequential (ms)", "Parallel (ms)", "Speedup", "MSamples/s");
    println!("{}", "-".repeat(69));

    let tensor = Tensor::new(TensorShape::SymmetricMatrix, 3, 3)?;
    for &n in &sizes {
        let mut a = Image::with_tensor(&[n, n], tensor, DType::U8)?;
        a.set(3u8)?;
        let mut b = Image::with_tensor(&[n, 1], tensor, DType::F32)?;
        b.set(0.5f32)?;

        let iters = if n <= 256 { 20 } else { 3 };
        tracing::debug!(size = n, iters, "benchmarking add");
        let seq = time_add(&a, &b, &ScanOptions::sequential(), iters)?;
        let par = match &pool {
            Some(p) => p.install(|| time_add(&a, &b, &ScanOptions::default(), iters))?,
            None => time_add(&a, &b, &ScanOptions::default(), iters)?,
        };

        let samples = (n * n * tensor.physical_elements()) as f64;
        println!(
            "{:<14} {:>14.3}ms {:>12.3}ms {:>8.1}x {:>12.1}",
            format!("{n}x{n}"),
            seq * 1000.0,
            par * 1000.0,
            seq / par,
            samples / par / 1e6,
        );
    }
    Ok(())
}
