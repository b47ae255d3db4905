use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use spectral_rocks::data::loader::{write_parquet, write_spectrum_csv};
use spectral_rocks::data::model::{wavelength, DataRaw, Spectrum, NUM_POINTS};

/// Write a synthetic labelled dataset of emission spectra.
#[derive(Parser)]
#[command(name = "generate_sample")]
#[command(version)]
struct Args {
    /// Root of the generated directory tree
    #[arg(short, long, default_value = "sample_data")]
    out: PathBuf,

    /// Measurement spots per mineral
    #[arg(long, default_value = "3")]
    spots: usize,

    /// Spectra per spot
    #[arg(long, default_value = "10")]
    per_spot: usize,

    /// Standard deviation of the additive noise
    #[arg(long, default_value = "0.01")]
    noise: f64,

    #[arg(long, default_value = "42")]
    seed: u64,

    /// Also write everything into one Parquet file
    #[arg(long)]
    parquet: Option<PathBuf>,
}

/// Emission lines as (centre nm, width nm, amplitude).
const MINERALS: [(&str, [(f64, f64, f64); 3]); 4] = [
    ("azurite", [(324.7, 0.6, 1.0), (327.4, 0.6, 0.7), (510.5, 1.0, 0.3)]),
    ("brochantite", [(324.7, 0.6, 0.8), (521.8, 1.0, 0.4), (777.4, 1.5, 0.5)]),
    ("hematite", [(259.9, 0.5, 0.9), (371.9, 0.8, 0.6), (438.4, 0.8, 0.5)]),
    ("malachite", [(324.7, 0.6, 0.6), (247.9, 0.5, 0.4), (656.3, 1.2, 0.7)]),
];

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Box-Muller transform for a standard normal draw.
fn gauss(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-15);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn generate_spectrum(lines: &[(f64, f64, f64)], gain: f64, noise: f64, rng: &mut StdRng) -> Spectrum {
    let y = (0..NUM_POINTS)
        .map(|i| {
            let wl = wavelength(i);
            let signal: f64 = lines
                .iter()
                .map(|&(mu, sigma, amp)| gaussian(wl, mu, sigma, amp * gain))
                .sum();
            signal + noise * gauss(rng)
        })
        .collect();
    Spectrum::new(y)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);

    let mut data = DataRaw::new();
    for (mineral, lines) in MINERALS {
        for spot in 0..args.spots {
            // Each spot sees its own overall intensity.
            let gain = 0.5 + rng.gen::<f64>();
            let dir = args.out.join(mineral).join(format!("spot{spot:02}"));
            fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

            let spectra = data.entry(format!("/{mineral}/spot{spot:02}")).or_default();
            for i in 0..args.per_spot {
                let spectrum = generate_spectrum(&lines, gain, args.noise, &mut rng);
                let path = dir.join(format!("{i}.csv"));
                write_spectrum_csv(&path, &spectrum)
                    .with_context(|| format!("writing {}", path.display()))?;
                spectra.push(spectrum);
            }
        }
        log::info!("Generated {mineral}");
    }

    if let Some(path) = &args.parquet {
        write_parquet(path, &data).with_context(|| format!("writing {}", path.display()))?;
        println!("Wrote {}", path.display());
    }

    println!(
        "Wrote {} spectra ({} points each) under {}",
        MINERALS.len() * args.spots * args.per_spot,
        NUM_POINTS,
        args.out.display()
    );
    Ok(())
}
