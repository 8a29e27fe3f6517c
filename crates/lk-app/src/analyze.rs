use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lk_core::config::EngineConfig;
use lk_core::features::FeatureFrame;
use lk_core::timeline::{FeatureTimeline, TimelineSummary};
use rayon::prelude::*;
use serde::Serialize;

/// Une ligne JSONL : temps du hop + features.
#[derive(Serialize)]
struct FrameRecord<'a> {
    /// Start of the hop, in seconds.
    t: f32,
    #[serde(flatten)]
    frame: &'a FeatureFrame,
}

#[derive(Serialize)]
struct FileSummary<'a> {
    file: &'a str,
    #[serde(flatten)]
    summary: TimelineSummary,
}

/// Write one JSON object per frame.
///
/// # Errors
/// Returns an error if serialization or the writer fails.
pub fn write_jsonl<W: Write>(timeline: &FeatureTimeline, mut writer: W) -> Result<()> {
    for (i, frame) in timeline.frames.iter().enumerate() {
        let record = FrameRecord {
            t: i as f32 * timeline.hop_duration,
            frame,
        };
        serde_json::to_writer(&mut writer, &record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the one-line JSON summary of `timeline`.
///
/// # Errors
/// Returns an error if serialization or the writer fails.
pub fn write_summary<W: Write>(
    path: &Path,
    timeline: &FeatureTimeline,
    mut writer: W,
) -> Result<()> {
    let name = path.to_string_lossy();
    let record = FileSummary {
        file: &name,
        summary: timeline.summary(),
    };
    serde_json::to_writer(&mut writer, &record)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// `<out_dir>/<file stem>.jsonl`
fn output_path(out_dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "audio".into(), |s| s.to_string_lossy());
    out_dir.join(format!("{stem}.jsonl"))
}

/// Analyse chaque fichier en parallèle (un moteur par fichier) puis écrit les
/// résultats dans l'ordre des arguments.
///
/// Un fichier en échec n'interrompt pas les autres.
///
/// # Errors
/// Returns an error if an output cannot be written or if any file failed.
pub fn run(
    files: &[PathBuf],
    out: Option<&Path>,
    summary: bool,
    config: &EngineConfig,
) -> Result<()> {
    let results: Vec<(&PathBuf, Result<FeatureTimeline>)> = files
        .par_iter()
        .map(|path| (path, lk_audio::analyze_file(path, config)))
        .collect();

    if let Some(dir) = out {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Impossible de créer {}", dir.display()))?;
    }

    let stdout = std::io::stdout();
    let mut failed = 0usize;
    for (path, result) in results {
        let timeline = match result {
            Ok(t) => t,
            Err(e) => {
                log::error!("{} : {e:#}", path.display());
                failed += 1;
                continue;
            }
        };
        log::info!(
            "{} : {} frames, {:.1} s",
            path.display(),
            timeline.frames.len(),
            timeline.duration_secs()
        );

        match (out, summary) {
            (Some(dir), false) => {
                let target = output_path(dir, path);
                let file = File::create(&target)
                    .with_context(|| format!("Impossible d'écrire {}", target.display()))?;
                write_jsonl(&timeline, BufWriter::new(file))?;
            }
            (_, true) => write_summary(path, &timeline, stdout.lock())?,
            (None, false) => write_jsonl(&timeline, BufWriter::new(stdout.lock()))?,
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} fichier(s) sur {} en échec", files.len());
    }
    Ok(())
}
