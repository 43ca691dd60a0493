mod args;
mod parse;

use std::path::Path;

use anyhow::{Context, Result};
use args::{CliArgs, Command, InputArgs, OutputArgs};
use clap::Parser;
use slice_core::{
    encode_batch, verify_batch, verify_slice, BatchView, Slice, SliceBuilder, SliceKind,
    VerifierOptions,
};

fn main() -> Result<()> {
    match std::env::var("RUST_LOG") {
        Ok(_) => (),
        Err(_) => std::env::set_var("RUST_LOG", "INFO"),
    }

    pretty_env_logger::formatted_timed_builder()
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or_default())
        .init();

    let args = CliArgs::parse();

    match args.command {
        Command::Encode {
            kind,
            index,
            value,
            force_defaults,
            output,
        } => {
            let slice = parse::parse_slice(kind.into(), index, &value)?;

            let mut builder = SliceBuilder::new();
            builder.set_force_defaults(force_defaults);
            let root = slice.encode_into(&mut builder)?;
            let bytes = builder.finish(root)?;

            log::info!("encoded {} slice into {} bytes", kind, bytes.len());
            write_output(&output, &bytes)
        }

        Command::EncodeBatch { input, output } => {
            let text = std::fs::read_to_string(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let slices: Vec<Slice> = serde_json::from_str(&text)
                .with_context(|| format!("{} is not a JSON array of slices", input.display()))?;

            let bytes = encode_batch(&slices)?;

            log::info!("encoded {} slices into {} bytes", slices.len(), bytes.len());
            write_output(&output, &bytes)
        }

        Command::Decode {
            kind,
            input,
            verify,
            pretty,
        } => {
            let bytes = read_input(&input)?;
            let kind = kind.map(SliceKind::from);

            if verify {
                verify_buffer(kind, &bytes, &VerifierOptions::default())?;
            }

            let json = match kind {
                Some(kind) => serde_json::to_value(Slice::decode(kind, &bytes)?)?,
                None => serde_json::to_value(BatchView::root(&bytes)?.to_vec()?)?,
            };

            match pretty {
                true => println!("{}", serde_json::to_string_pretty(&json)?),
                false => println!("{}", json),
            }
            Ok(())
        }

        Command::Verify {
            kind,
            input,
            limits,
        } => {
            let bytes = read_input(&input)?;
            verify_buffer(kind.map(SliceKind::from), &bytes, &(&limits).into())?;

            log::info!("buffer of {} bytes is well-formed", bytes.len());
            Ok(())
        }
    }
}

/// Verify a single-slice buffer of `kind`, or a batch buffer when no kind is given.
fn verify_buffer(kind: Option<SliceKind>, bytes: &[u8], options: &VerifierOptions) -> Result<()> {
    match kind {
        Some(kind) => verify_slice(kind, bytes, options),
        None => verify_batch(bytes, options),
    }
    .context("buffer failed verification")
}

fn read_input(input: &InputArgs) -> Result<Vec<u8>> {
    match (&input.file, &input.hex) {
        (Some(path), _) => read_file(path),
        (None, Some(hex)) => parse::from_hex(hex),
        (None, None) => anyhow::bail!("no input given"),
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn write_output(output: &OutputArgs, bytes: &[u8]) -> Result<()> {
    match &output.output {
        Some(path) => std::fs::write(path, bytes)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{}", parse::to_hex(bytes));
            Ok(())
        }
    }
}
