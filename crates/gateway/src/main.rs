//! Gateway - Trust-boundary check for agent envelope streams
//!
//! Responsibilities:
//! - Read a captured envelope stream (JSON Lines or server-sent events)
//! - Validate every unit against the envelope schema
//! - Enforce run sequencing (nothing after a run's final envelope)
//! - Re-emit accepted envelopes and report rejections
//!
//! Key property: no transport and no retries; a rejected unit is reported, never repaired

mod config;
mod run_tracker;
mod validator;

use clap::Parser;
use config::{ContractDocument, GatewayConfig, InputFormat};
use contract::api::OPENAPI_SOURCE;
use contract::schema::SCHEMA_SOURCE;
use contract::sse::EventDecoder;
use contract::{AgentEnvelope, ApiDescription, EnvelopeSchema, FinalBody, KindedEnvelope};
use run_tracker::RunTracker;
use std::future::Future;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};
use validator::{Rejection, RejectionRecord};

type Writer = Box<dyn AsyncWrite + Unpin + Send>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let config = GatewayConfig::parse();

    if let Some(document) = config.print_contract {
        print_contract(document)?;
        return Ok(());
    }

    info!("Gateway starting...");
    info!("Configuration loaded:");
    info!("  Input: {} ({:?})", config.input, config.format);
    info!("  Output: {}", config.output);
    info!("  Rejections: {}", config.rejections.as_deref().unwrap_or("log only"));
    info!("  Verbose rejections: {}", config.verbose_rejections);

    let schema = EnvelopeSchema::shared()?;

    let input: Box<dyn AsyncBufRead + Unpin + Send> = if config.input == "-" {
        Box::new(BufReader::new(tokio::io::stdin()))
    } else {
        Box::new(BufReader::new(tokio::fs::File::open(&config.input).await?))
    };
    let mut output = open_writer(&config.output).await?;
    let mut rejections = match &config.rejections {
        Some(path) => Some(open_writer(path).await?),
        None => None,
    };

    let mut gateway = Gateway::new(schema, config.verbose_rejections);

    info!("Gateway running");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    run(
        input,
        config.format,
        &mut gateway,
        &mut output,
        rejections.as_mut(),
        shutdown,
    )
    .await?;

    let summary = gateway.summary();
    info!(
        "Done: {} accepted ({} progress, {} action, {} final), {} rejected, {} run(s) finished",
        summary.accepted,
        summary.progress,
        summary.actions,
        summary.finals,
        summary.rejected,
        summary.finished_runs
    );
    for run_id in &summary.open_runs {
        warn!("Run {} ended without a final envelope", run_id);
    }

    if config.fail_on_reject && summary.rejected > 0 {
        return Err(format!("{} envelope(s) rejected", summary.rejected).into());
    }

    Ok(())
}

fn print_contract(document: ContractDocument) -> Result<(), Box<dyn std::error::Error>> {
    match document {
        ContractDocument::Schema => {
            EnvelopeSchema::shared()?;
            println!("{}", SCHEMA_SOURCE.trim_end());
        }
        ContractDocument::Openapi => {
            ApiDescription::load()?.verify()?;
            println!("{}", OPENAPI_SOURCE.trim_end());
        }
    }
    Ok(())
}

async fn open_writer(path: &str) -> std::io::Result<Writer> {
    if path == "-" {
        Ok(Box::new(tokio::io::stdout()))
    } else {
        Ok(Box::new(tokio::fs::File::create(path).await?))
    }
}

/// Counters reported when the input ends
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub accepted: usize,
    pub rejected: usize,
    pub progress: usize,
    pub actions: usize,
    pub finals: usize,
    pub finished_runs: usize,
    pub open_runs: Vec<String>,
}

/// Verdict on one unit of input
#[derive(Debug)]
enum Verdict {
    Accepted(AgentEnvelope),
    Rejected(RejectionRecord),
}

struct Gateway<'a> {
    schema: &'a EnvelopeSchema,
    tracker: RunTracker,
    verbose_rejections: bool,
    units: usize,
    summary: Summary,
}

impl<'a> Gateway<'a> {
    fn new(schema: &'a EnvelopeSchema, verbose_rejections: bool) -> Self {
        Self {
            schema,
            tracker: RunTracker::new(),
            verbose_rejections,
            units: 0,
            summary: Summary::default(),
        }
    }

    fn process(&mut self, raw: &str) -> Verdict {
        self.units += 1;

        let admitted = validator::validate_unit(self.schema, raw).and_then(|envelope| {
            self.tracker
                .observe(envelope.id.as_str(), envelope.kind())
                .map(|()| envelope)
                .map_err(Rejection::Sequence)
        });

        match admitted {
            Ok(envelope) => {
                self.summary.accepted += 1;
                Verdict::Accepted(envelope)
            }
            Err(rejection) => self.reject(raw, rejection),
        }
    }

    /// A unit that is not valid UTF-8 never reaches the schema
    fn process_undecodable(&mut self, raw: &[u8], error: std::str::Utf8Error) -> Verdict {
        self.units += 1;
        let lossy = String::from_utf8_lossy(raw);
        self.reject(&lossy, Rejection::Malformed(format!("invalid UTF-8: {}", error)))
    }

    fn reject(&mut self, raw: &str, rejection: Rejection) -> Verdict {
        self.summary.rejected += 1;
        warn!("Rejected unit {}: {}", self.units, rejection);
        Verdict::Rejected(validator::create_rejection(
            self.units,
            raw,
            rejection,
            self.verbose_rejections,
        ))
    }

    fn dispatch(&mut self, envelope: AgentEnvelope) {
        match envelope.into_kinded() {
            KindedEnvelope::Progress(progress) => {
                self.summary.progress += 1;
                info!(
                    "Progress: run={}, status={:?}, progress={:?}, step={:?}: {}",
                    progress.id,
                    progress.body.status,
                    progress.body.progress.map(|p| p.get()),
                    progress.body.step.as_ref().map(ToString::to_string),
                    progress.body.message
                );
            }
            KindedEnvelope::Action(action) => {
                self.summary.actions += 1;
                info!(
                    "Action: run={}, name={}, call={}, expect_reply={}",
                    action.id,
                    action.body.name,
                    action.body.id.as_deref().unwrap_or("-"),
                    action.body.expect_reply.unwrap_or(false)
                );
            }
            KindedEnvelope::Final(done) => {
                self.summary.finals += 1;
                let (progress, actions) = self
                    .tracker
                    .get(done.id.as_str())
                    .map_or((0, 0), |run| (run.progress, run.actions));
                match &done.body {
                    FinalBody::Success(success) => info!(
                        "Final: run={}, outcome=success, citations={}, after {} progress/{} action: {}",
                        done.id,
                        success.citations.as_ref().map_or(0, Vec::len),
                        progress,
                        actions,
                        success.message
                    ),
                    FinalBody::Failure(failure) => warn!(
                        "Final: run={}, outcome=failure, error={}, after {} progress/{} action: {}",
                        done.id, failure.error, progress, actions, failure.message
                    ),
                }
            }
        }
    }

    fn summary(&self) -> Summary {
        Summary {
            finished_runs: self.tracker.finished_count(),
            open_runs: self
                .tracker
                .open_runs()
                .into_iter()
                .map(str::to_owned)
                .collect(),
            ..self.summary.clone()
        }
    }
}

/// Pump units from `input` through the gateway until EOF or shutdown
async fn run<R, O, J, S>(
    input: R,
    format: InputFormat,
    gateway: &mut Gateway<'_>,
    output: &mut O,
    mut rejections: Option<&mut J>,
    shutdown: S,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
    J: AsyncWrite + Unpin,
    S: Future<Output = ()>,
{
    let mut segments = input.split(b'\n');
    let mut decoder = EventDecoder::new();
    tokio::pin!(shutdown);

    loop {
        let segment = tokio::select! {
            biased;
            _ = &mut shutdown => {
                warn!("Interrupted, stopping before end of input");
                break;
            }
            segment = segments.next_segment() => segment?,
        };
        let Some(mut segment) = segment else {
            break;
        };
        if segment.last() == Some(&b'\r') {
            segment.pop();
        }

        let line = match String::from_utf8(segment) {
            Ok(line) => line,
            Err(e) => {
                let verdict = gateway.process_undecodable(e.as_bytes(), e.utf8_error());
                write_verdict(verdict, gateway, output, rejections.as_deref_mut()).await?;
                continue;
            }
        };

        let unit = match format {
            InputFormat::Jsonl if line.trim().is_empty() => None,
            InputFormat::Jsonl => Some(line),
            InputFormat::Sse => decoder.push_line(&line).map(|event| event.data),
        };
        if let Some(unit) = unit {
            let verdict = gateway.process(&unit);
            write_verdict(verdict, gateway, output, rejections.as_deref_mut()).await?;
        }
    }

    if format == InputFormat::Sse {
        if let Some(event) = decoder.finish() {
            let verdict = gateway.process(&event.data);
            write_verdict(verdict, gateway, output, rejections.as_deref_mut()).await?;
        }
    }

    output.flush().await?;
    if let Some(rejections) = rejections {
        rejections.flush().await?;
    }
    Ok(())
}

async fn write_verdict<O, J>(
    verdict: Verdict,
    gateway: &mut Gateway<'_>,
    output: &mut O,
    rejections: Option<&mut J>,
) -> std::io::Result<()>
where
    O: AsyncWrite + Unpin,
    J: AsyncWrite + Unpin,
{
    match verdict {
        Verdict::Accepted(envelope) => {
            let line = serde_json::to_string(&envelope)?;
            output.write_all(line.as_bytes()).await?;
            output.write_all(b"\n").await?;
            debug!("Accepted envelope for run {}", envelope.id);
            gateway.dispatch(envelope);
        }
        Verdict::Rejected(record) => {
            if let Some(rejections) = rejections {
                let line = serde_json::to_string(&record)?;
                rejections.write_all(line.as_bytes()).await?;
                rejections.write_all(b"\n").await?;
            }
        }
    }
    Ok(())
}
