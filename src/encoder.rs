//! # Encoder Module
//!
//! Questo modulo gestisce l'invocazione degli encoder esterni.
//!
//! ## Responsabilità:
//! - Selezione dell'encoder in base alla coppia formato sorgente/destinazione
//! - Costruzione della command line come lista di argomenti (niente shell,
//!   quindi nessun problema con apici o spazi nei nomi dei file)
//! - Esecuzione fino al termine, stdout/stderr scartati
//! - Verifica del risultato: codice di uscita e/o presenza del file di output
//!
//! ## Encoder supportati:
//! - **ogg**: `oggenc <in> --output=<out> --quality=<q>`
//! - **mp3 da flac**: `flac --decode --stdout <in> | lame - <out> -V<v>`
//!   (lame non legge il container flac)
//! - **mp3 da altri formati**: `lame <in> <out> -V<v>`
//!
//! ## Verifica del successo:
//! - `ExitCheck::Strict`: ogni processo deve uscire con 0 e l'output deve esistere
//! - `ExitCheck::OutputOnly`: conta solo l'esistenza del file di output; un
//!   output troncato o vuoto lasciato da un encoder fallito viene accettato
//!
//! Nessun retry, nessun timeout: un encoder bloccato blocca il suo worker.
//! Raccomandazioni sui parametri: wiki di hydrogenaudio (Recommended Ogg
//! Vorbis, LAME).
//!
//! ## Esempio:
//! ```ignore
//! let encoder = Encoder::from_config(&config)?;
//! encoder.encode(&input, &output).await?;
//! ```

use crate::config::{AudioFormat, Config, ExitCheck};
use crate::error::AudioTreeError;
use crate::platform::PlatformCommands;
use anyhow::Result;
use std::ffi::OsString;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tracing::debug;

/// One argument of an encoder command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderArg {
    /// Passed verbatim
    Fixed(String),
    /// The input path, glued to `prefix`
    Input { prefix: String },
    /// The output path, glued to `prefix` (e.g. `--output=`)
    Output { prefix: String },
}

impl EncoderArg {
    pub fn fixed(value: impl Into<String>) -> Self {
        Self::Fixed(value.into())
    }

    pub fn input() -> Self {
        Self::Input {
            prefix: String::new(),
        }
    }

    pub fn output() -> Self {
        Self::Output {
            prefix: String::new(),
        }
    }

    pub fn output_with_prefix(prefix: impl Into<String>) -> Self {
        Self::Output {
            prefix: prefix.into(),
        }
    }

    fn render(&self, input: &Path, output: &Path) -> OsString {
        match self {
            Self::Fixed(value) => OsString::from(value),
            Self::Input { prefix } => glue(prefix, input),
            Self::Output { prefix } => glue(prefix, output),
        }
    }
}

fn glue(prefix: &str, path: &Path) -> OsString {
    let mut arg = OsString::from(prefix);
    arg.push(path.as_os_str());
    arg
}

/// A single external program and its argument template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderStage {
    pub program: String,
    pub args: Vec<EncoderArg>,
}

impl EncoderStage {
    pub fn new(program: impl Into<String>, args: Vec<EncoderArg>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Concrete argv (without the program name)
    pub fn render_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        self.args
            .iter()
            .map(|arg| arg.render(input, output))
            .collect()
    }

    /// Executable actually launched, resolved like the dependency check does
    pub fn executable(&self) -> &str {
        PlatformCommands::instance().get_command(&self.program)
    }

    fn command(&self, input: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(self.executable());
        cmd.args(self.render_args(input, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

/// Fixed encoder template, chosen once per run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderDescriptor {
    Single(EncoderStage),
    /// Decoder stdout piped into encoder stdin
    Piped {
        decoder: EncoderStage,
        encoder: EncoderStage,
    },
}

impl EncoderDescriptor {
    /// Pick the encoder for the configured format pair
    pub fn select(config: &Config) -> Result<Self> {
        match (config.source_format, config.target_format) {
            (_, AudioFormat::Ogg) => Ok(Self::Single(EncoderStage::new(
                "oggenc",
                vec![
                    EncoderArg::input(),
                    EncoderArg::output_with_prefix("--output="),
                    EncoderArg::fixed(format!("--quality={}", config.ogg_quality)),
                ],
            ))),
            (AudioFormat::Flac, AudioFormat::Mp3) => Ok(Self::Piped {
                decoder: EncoderStage::new(
                    "flac",
                    vec![
                        EncoderArg::fixed("--decode"),
                        EncoderArg::fixed("--stdout"),
                        EncoderArg::input(),
                    ],
                ),
                encoder: EncoderStage::new(
                    "lame",
                    vec![
                        EncoderArg::fixed("-"),
                        EncoderArg::output(),
                        EncoderArg::fixed(format!("-V{}", config.mp3_vbr_quality)),
                    ],
                ),
            }),
            (_, AudioFormat::Mp3) => Ok(Self::Single(EncoderStage::new(
                "lame",
                vec![
                    EncoderArg::input(),
                    EncoderArg::output(),
                    EncoderArg::fixed(format!("-V{}", config.mp3_vbr_quality)),
                ],
            ))),
            (_, target) => Err(AudioTreeError::UnsupportedTarget(target.to_string()).into()),
        }
    }

    /// Programs that must be installed for this descriptor
    pub fn programs(&self) -> Vec<&str> {
        match self {
            Self::Single(stage) => vec![stage.program.as_str()],
            Self::Piped { decoder, encoder } => {
                vec![decoder.program.as_str(), encoder.program.as_str()]
            }
        }
    }
}

/// Runs a descriptor against input/output pairs
#[derive(Debug, Clone)]
pub struct Encoder {
    descriptor: EncoderDescriptor,
    exit_check: ExitCheck,
}

impl Encoder {
    pub fn new(descriptor: EncoderDescriptor, exit_check: ExitCheck) -> Self {
        Self {
            descriptor,
            exit_check,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(EncoderDescriptor::select(config)?, config.exit_check))
    }

    pub fn descriptor(&self) -> &EncoderDescriptor {
        &self.descriptor
    }

    /// Encode `input` into `output`
    pub async fn encode(&self, input: &Path, output: &Path) -> Result<()> {
        let statuses = match &self.descriptor {
            EncoderDescriptor::Single(stage) => self.run_single(stage, input, output).await,
            EncoderDescriptor::Piped { decoder, encoder } => {
                self.run_piped(decoder, encoder, input, output).await
            }
        }
        .map_err(|e| AudioTreeError::EncodeFailed {
            output: output.to_path_buf(),
            reason: e.to_string(),
        })?;

        if self.exit_check == ExitCheck::Strict {
            if let Some((program, status)) = statuses.iter().find(|(_, status)| !status.success()) {
                return Err(AudioTreeError::EncodeFailed {
                    output: output.to_path_buf(),
                    reason: format!("{} exited with {}", program, status),
                }
                .into());
            }
        }

        // Existence of the artifact is the success signal in both modes
        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            return Err(AudioTreeError::EncodeFailed {
                output: output.to_path_buf(),
                reason: "encoder did not produce an output file".to_string(),
            }
            .into());
        }

        Ok(())
    }

    async fn run_single<'a>(
        &self,
        stage: &'a EncoderStage,
        input: &Path,
        output: &Path,
    ) -> std::io::Result<Vec<(&'a str, ExitStatus)>> {
        debug!("Running {} for {}", stage.program, input.display());

        let status = stage
            .command(input, output)
            .status()
            .await
            .map_err(|e| spawn_error(&stage.program, e))?;

        Ok(vec![(stage.program.as_str(), status)])
    }

    async fn run_piped<'a>(
        &self,
        decoder: &'a EncoderStage,
        encoder: &'a EncoderStage,
        input: &Path,
        output: &Path,
    ) -> std::io::Result<Vec<(&'a str, ExitStatus)>> {
        debug!(
            "Running {} | {} for {}",
            decoder.program,
            encoder.program,
            input.display()
        );

        let mut decoder_child = decoder
            .command(input, output)
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(&decoder.program, e))?;

        let pipe: Stdio = decoder_child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("decoder stdout is not captured"))?
            .try_into()?;

        let mut encoder_child = encoder
            .command(input, output)
            .stdin(pipe)
            .spawn()
            .map_err(|e| spawn_error(&encoder.program, e))?;

        let (decoder_status, encoder_status) =
            futures::future::try_join(decoder_child.wait(), encoder_child.wait()).await?;

        Ok(vec![
            (decoder.program.as_str(), decoder_status),
            (encoder.program.as_str(), encoder_status),
        ])
    }
}

fn spawn_error(program: &str, error: std::io::Error) -> std::io::Error {
    std::io::Error::new(error.kind(), format!("failed to run {}: {}", program, error))
}
