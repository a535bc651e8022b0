//! Result output formatting and writing.

use crate::orchestrator::RunResults;
use crate::OutputFormat;
use anyhow::Result;
use lib_types::waveform::Waveform;
use std::io::Write;
use std::path::Path;

/// Write run results to the output directory.
pub fn write_results(results: &RunResults, output_dir: &Path, format: OutputFormat) -> Result<()> {
    std::fs::create_dir_all(output_dir)?;

    let impulse_path = output_dir.join("impulse_response.csv");
    write_waveform(&results.impulse, &impulse_path)?;
    tracing::info!("Wrote impulse response to {:?}", impulse_path);

    let pulse_path = output_dir.join("pulse_response.csv");
    write_waveform(&results.pulse, &pulse_path)?;
    tracing::info!("Wrote pulse response to {:?}", pulse_path);

    let taps_path = output_dir.join(match format {
        OutputFormat::Text => "ffe_taps.txt",
        OutputFormat::Json => "ffe_taps.json",
        OutputFormat::Csv => "ffe_taps.csv",
    });
    let mut f = std::fs::File::create(&taps_path)?;
    write_taps(&mut f, results, format)?;
    tracing::info!("Wrote FFE taps to {:?}", taps_path);

    let summary_path = output_dir.join("summary.txt");
    let mut f = std::fs::File::create(&summary_path)?;
    write_summary(&mut f, results)?;
    tracing::info!("Wrote summary to {:?}", summary_path);

    Ok(())
}

fn write_waveform(waveform: &Waveform, path: &Path) -> Result<()> {
    let mut f = std::io::BufWriter::new(std::fs::File::create(path)?);
    writeln!(f, "time_ps,amplitude")?;
    for (i, &v) in waveform.samples.iter().enumerate() {
        writeln!(f, "{},{}", waveform.time_at(i).as_ps(), v)?;
    }
    f.flush()?;
    Ok(())
}

/// Tap index relative to the main cursor (`-1` is the first precursor).
fn tap_offset(index: usize, n_taps_pre: usize) -> i64 {
    index as i64 - n_taps_pre as i64
}

fn write_taps(f: &mut impl Write, results: &RunResults, format: OutputFormat) -> Result<()> {
    let taps = &results.taps;
    let coeffs = &results.coefficients;

    match format {
        OutputFormat::Text => {
            writeln!(f, "FFE Taps ({} pre, {} post)", taps.n_taps_pre, taps.n_taps_post())?;
            writeln!(f, "==========================")?;
            for (i, w) in taps.weights.iter().enumerate() {
                let offset = tap_offset(i, taps.n_taps_pre);
                let marker = if offset == 0 { "  <- main" } else { "" };
                writeln!(f, "  [{:+3}] {:>12.6}{}", offset, w, marker)?;
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "name": results.name,
                "channel": results.channel,
                "n_taps_pre": taps.n_taps_pre,
                "n_taps_post": taps.n_taps_post(),
                "weights": taps.weights,
                "channel_coefficients": coeffs.coefficients,
                "cursor_index": coeffs.cursor,
                "equalized": results.equalized,
            });
            writeln!(f, "{}", serde_json::to_string_pretty(&json)?)?;
        }
        OutputFormat::Csv => {
            writeln!(f, "offset,weight,channel_coefficient,equalized")?;
            for (i, w) in taps.weights.iter().enumerate() {
                writeln!(
                    f,
                    "{},{},{},{}",
                    tap_offset(i, taps.n_taps_pre),
                    w,
                    coeffs.coefficients[i],
                    results.equalized[i]
                )?;
            }
        }
    }
    Ok(())
}

fn write_summary(f: &mut impl Write, results: &RunResults) -> Result<()> {
    writeln!(f, "SerDes FFE Summary: {}", results.name)?;
    writeln!(f, "==================")?;
    writeln!(f)?;
    writeln!(f, "Channel:          {}", results.channel)?;
    writeln!(f, "Symbol rate:      {:.3} GBd", results.symbol_rate.as_gbaud())?;
    writeln!(f, "Samples/symbol:   {}", results.samples_per_symbol)?;
    writeln!(f, "Time step:        {:.4} ps", results.impulse.dt.as_ps())?;
    writeln!(f, "Frequency bins:   {}", results.frequency_bins)?;
    writeln!(f, "DC gain:          {:.6}", results.dc_gain)?;
    writeln!(f, "Loss at Nyquist:  {:.2} dB", results.nyquist_loss_db)?;
    writeln!(f)?;
    writeln!(
        f,
        "Main cursor:      {:.6} at {:.2} ns",
        results.coefficients.main_cursor(),
        results.impulse.time_at(results.coefficients.cursor).as_ns()
    )?;
    writeln!(f, "Channel coefficients:")?;
    for (i, c) in results.coefficients.coefficients.iter().enumerate() {
        writeln!(f, "  [{:+3}] {:>12.6}", tap_offset(i, results.coefficients.n_taps_pre), c)?;
    }
    writeln!(f)?;
    write_taps(f, results, crate::OutputFormat::Text)?;
    writeln!(f)?;
    writeln!(f, "Residual ISI:     {:.3e}", results.residual_isi())?;
    Ok(())
}

/// Print results to stdout.
pub fn print_results(results: &RunResults, format: OutputFormat) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match format {
        OutputFormat::Text => {
            writeln!(out, "\n=== {} ===\n", results.name)?;
            writeln!(out, "Channel: {}", results.channel)?;
            writeln!(out, "Loss at Nyquist: {:.2} dB", results.nyquist_loss_db)?;
            writeln!(
                out,
                "Main cursor: {:.6} (sample {})",
                results.coefficients.main_cursor(),
                results.coefficients.cursor
            )?;
            writeln!(out)?;
            write_taps(&mut out, results, format)?;
        }
        _ => write_taps(&mut out, results, format)?,
    }
    Ok(())
}
