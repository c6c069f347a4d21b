//! Ask command handler.
//!
//! Runs one question through the full pipeline and prints the answer.

use civic_core::{config::AppConfig, AppError, AppResult};
use civic_knowledge::{Collection, Pipeline};
use clap::Args;
use std::path::PathBuf;

/// Answer a single question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: Option<String>,

    /// Read the question from a file
    #[arg(short, long, conflicts_with = "question")]
    pub file: Option<PathBuf>,

    /// Also print both partial answers
    #[arg(long)]
    pub partials: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let question = self.question_text()?;
        tracing::debug!("Question: {}", question);

        config.validate_credentials()?;
        let pipeline = Pipeline::from_config(config)?;
        let answer = pipeline.answer(&question).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&answer)?);
            return Ok(());
        }

        if self.partials {
            for collection in Collection::ALL {
                if let Some(partial) = answer.partial(collection) {
                    println!("## {}\n\n{}\n", collection, partial.answer);
                }
            }
            println!("## answer\n");
        }
        println!("{}", answer.answer);

        Ok(())
    }

    fn question_text(&self) -> AppResult<String> {
        let text = match (&self.question, &self.file) {
            (Some(question), _) => question.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)?,
            (None, None) => {
                return Err(AppError::Config("No question provided".to_string()));
            }
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Config("Question is empty".to_string()));
        }
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn command(question: Option<&str>, file: Option<PathBuf>) -> AskCommand {
        AskCommand {
            question: question.map(str::to_string),
            file,
            partials: false,
            json: false,
        }
    }

    #[test]
    fn test_question_from_argument_is_trimmed() {
        let cmd = command(Some("  Cum platesc taxa?  "), None);
        assert_eq!(cmd.question_text().unwrap(), "Cum platesc taxa?");
    }

    #[test]
    fn test_question_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("q.txt");
        std::fs::write(&path, "Ce acte trebuie?\n").unwrap();

        let cmd = command(None, Some(path));
        assert_eq!(cmd.question_text().unwrap(), "Ce acte trebuie?");
    }

    #[test]
    fn test_missing_or_blank_question() {
        assert!(command(None, None).question_text().is_err());
        assert!(command(Some("   "), None).question_text().is_err());
    }
}
