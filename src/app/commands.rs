use crate::adapters::crm::HttpLeadSink;
use crate::adapters::gemini::{GenerativeChatBackend, DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::adapters::storage::LocalStorage;
use crate::app::report;
use crate::config::cli::{ChatArgs, LeadArgs, LoanArgs};
use crate::config::{CliConfig, Command, RatesConfig};
use crate::core::assistant::AssistantSession;
use crate::core::{calculator, offers, wizard};
use crate::domain::model::Lead;
use crate::domain::ports::{ChatBackend, LeadSink, Storage};
use crate::utils::error::{MortgageError, Result};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Runs one non-interactive command and returns the text to print.
pub async fn execute(config: &CliConfig, rates: &RatesConfig) -> Result<String> {
    match &config.command {
        Command::Payment { loan, rate, term } => {
            let payment = calculator::monthly_payment(*loan, *rate, *term);
            if config.json {
                Ok(serde_json::json!({ "monthly_payment": payment }).to_string())
            } else {
                Ok(format!("Monthly payment: {}", report::format_czk(payment)))
            }
        }
        Command::Assess(args) => {
            args.validate_terms(&rates.limits)?;
            assess(args, rates, config.json)
        }
        Command::Offers(args) => {
            args.validate_terms(&rates.limits)?;
            let state = args.to_state();
            let found = offers::best_offers(&state, &rates.banks, rates.offer_limit);
            if config.json {
                Ok(serde_json::to_string_pretty(&found)?)
            } else {
                Ok(report::format_offers(&found))
            }
        }
        Command::Schedule {
            loan,
            rate,
            term,
            yearly,
            csv,
        } => schedule(*loan, *rate, *term, *yearly, csv.as_deref(), config.json).await,
        Command::Lead(args) => submit_lead(args).await,
        Command::Chat(_) => Err(MortgageError::InvalidStateError {
            message: "chat is interactive, use run_chat".to_string(),
        }),
    }
}

fn assess(args: &LoanArgs, rates: &RatesConfig, json: bool) -> Result<String> {
    let summary = wizard::summarize(&args.to_state(), rates)?;
    if json {
        Ok(serde_json::to_string_pretty(&summary)?)
    } else {
        Ok(report::format_summary(&summary))
    }
}

async fn schedule(
    loan: f64,
    rate: f64,
    term: u32,
    yearly: bool,
    csv_path: Option<&Path>,
    json: bool,
) -> Result<String> {
    let rows = calculator::amortization_schedule(loan, rate, term);
    let years = calculator::yearly_summary(&rows);

    if let Some(path) = csv_path {
        let data = if yearly {
            report::to_csv(&years)?
        } else {
            report::to_csv(&rows)?
        };
        let (dir, file) = split_path(path)?;
        LocalStorage::new(dir).write_file(&file, &data).await?;
        tracing::info!("📁 Schedule written to {}", path.display());
        return Ok(format!("📁 Schedule written to {}", path.display()));
    }

    Ok(match (json, yearly) {
        (true, true) => serde_json::to_string_pretty(&years)?,
        (true, false) => serde_json::to_string_pretty(&rows)?,
        (false, true) => report::format_yearly(&years),
        (false, false) => report::format_monthly(&rows),
    })
}

fn split_path(path: &Path) -> Result<(std::path::PathBuf, String)> {
    let file = path
        .file_name()
        .and_then(|f| f.to_str())
        .ok_or_else(|| MortgageError::validation("csv", "must point to a file"))?
        .to_string();
    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    Ok((dir, file))
}

async fn submit_lead(args: &LeadArgs) -> Result<String> {
    let sink = HttpLeadSink::new(&args.endpoint, Duration::from_secs(30))?;
    let lead = Lead {
        name: args.name.clone(),
        email: args.email.clone(),
        phone: args.phone.clone(),
        note: args.note.clone(),
        ..Default::default()
    };
    sink.submit(&lead).await?;
    Ok("✅ Lead submitted".to_string())
}

/// 依參數建立對話後端：有 endpoint 走 proxy，否則直接呼叫 API
pub fn chat_backend(args: &ChatArgs) -> Result<GenerativeChatBackend> {
    let timeout = Duration::from_secs(args.timeout);
    match &args.endpoint {
        Some(endpoint) => GenerativeChatBackend::via_proxy(endpoint, timeout),
        None => {
            let api_key = std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| MortgageError::MissingConfigError {
                    field: "GEMINI_API_KEY".to_string(),
                })?;
            let base = std::env::var("GEMINI_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
            let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
            GenerativeChatBackend::direct(&base, &model, api_key, timeout)
        }
    }
}

/// Line-oriented chat loop. `/reset` clears the conversation, `/quit` ends it
/// and prints the wizard summary when enough parameters were gathered.
pub async fn run_chat<B, R, W>(
    mut session: AssistantSession<B>,
    rates: &RatesConfig,
    input: R,
    output: &mut W,
) -> Result<()>
where
    B: ChatBackend,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    output
        .write_all("🏠 Mortgage assistant. Type /quit to finish.\n> ".as_bytes())
        .await?;
    output.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => {}
            "/quit" | "/exit" => break,
            "/reset" => {
                session.reset();
                output.write_all(b"Conversation cleared.\n").await?;
            }
            text => match session.send(text).await {
                Ok(reply) => {
                    let mut out = format!("{}\n", reply.text);
                    if let Some(estimate) = &reply.estimate {
                        out.push_str(&format!("\n{}\n", report::format_report(estimate)));
                    }
                    output.write_all(out.as_bytes()).await?;
                }
                Err(e) => {
                    tracing::warn!("Assistant turn failed: {}", e);
                    let message = format!("❌ {}\n💡 {}\n", e.user_friendly_message(), e.recovery_suggestion());
                    output.write_all(message.as_bytes()).await?;
                }
            },
        }
        output.write_all(b"> ").await?;
        output.flush().await?;
    }

    let wizard = session.into_wizard();
    let (step, total) = wizard.progress();
    if wizard.is_complete() {
        let summary = wizard.summary(rates)?;
        let text = format!("\n{}\n", report::format_summary(&summary));
        output.write_all(text.as_bytes()).await?;
    } else {
        let text = format!("\nCollected parameters cover step {} of {}.\n", step, total);
        output.write_all(text.as_bytes()).await?;
    }
    output.flush().await?;
    Ok(())
}
