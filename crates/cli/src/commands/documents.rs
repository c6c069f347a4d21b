//! Documents command handler.

use civic_core::{config::AppConfig, AppResult};
use civic_knowledge::{cache_from_config, CollectionStats};
use clap::Args;

/// Inspect the loaded document collections
#[derive(Args, Debug)]
pub struct DocumentsCommand {
    /// Force a re-read of both sources
    #[arg(long)]
    pub reload: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl DocumentsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let cache = cache_from_config(config);
        let stats = if self.reload {
            cache.reload_all().await?
        } else {
            cache.preload().await?;
            cache.stats()?
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            for entry in &stats {
                println!("{}", render(entry));
            }
        }
        Ok(())
    }
}

fn render(stats: &CollectionStats) -> String {
    let dimension = stats
        .dimension
        .map(|d| d.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    format!(
        "{:<12} {:>6} documents  {:>6} rankable  dimension {}  ({})",
        stats.collection.as_str(),
        stats.documents,
        stats.rankable,
        dimension,
        stats.source
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_knowledge::Collection;

    #[test]
    fn test_render_line() {
        let stats = CollectionStats {
            collection: Collection::Service,
            loaded: true,
            documents: 12,
            rankable: 10,
            dimension: Some(1536),
            loaded_at: None,
            source: "data/services.csv".to_string(),
        };

        let line = render(&stats);
        assert!(line.starts_with("service"));
        assert!(line.contains("12 documents"));
        assert!(line.contains("10 rankable"));
        assert!(line.contains("dimension 1536"));
        assert!(line.ends_with("(data/services.csv)"));
    }
}
