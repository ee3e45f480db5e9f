use anyhow::Result;
use gha_profiler::CachedFile;
use serde::Serialize;

pub struct CliLogger {
    json: bool,
    no_color: bool,
}

impl CliLogger {
    pub fn new(json: bool, no_color: bool) -> Self {
        Self { json, no_color }
    }

    pub fn print_serialized<T: Serialize>(&self, value: &T) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(value)?);
        } else {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        Ok(())
    }

    pub fn print_cache_listing(&self, files: &[CachedFile]) -> Result<()> {
        if self.json {
            return self.print_serialized(&files);
        }
        if files.is_empty() {
            println!("{}", self.style("cache is empty", "90"));
            return Ok(());
        }
        let total: u64 = files.iter().map(|f| f.bytes).sum();
        for file in files {
            println!(
                "{} {}",
                self.style(&format!("{:>10}", file.bytes), "90"),
                file.url.as_deref().unwrap_or(&file.path)
            );
        }
        println!(
            "{} {} entries, {} bytes",
            self.style("total", "37;1"),
            files.len(),
            total
        );
        Ok(())
    }

    pub fn print_error(&self, msg: &str) {
        if self.json {
            let out = serde_json::json!({
                "status": "error",
                "code": "error",
                "message": msg,
            });
            eprintln!("{out}");
            return;
        }
        eprintln!("{} {msg}", self.style("error", "31;1"));
    }

    pub fn print_warning(&self, msg: &str) {
        if self.json {
            let out = serde_json::json!({
                "status": "warning",
                "code": "warning",
                "message": msg,
            });
            eprintln!("{out}");
            return;
        }
        eprintln!("{} {msg}", self.style("warn", "33;1"));
    }

    fn style(&self, text: &str, ansi: &str) -> String {
        if self.no_color {
            return text.to_string();
        }
        format!("\x1b[{ansi}m{text}\x1b[0m")
    }
}
