use csv::Writer;
use std::collections::BTreeSet;
use std::error::Error;
use std::ffi::OsStr;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use super::eval::EvalResult;

// Logger class for logging rollout and evaluation data
pub trait Logger {
    // log a piece of data
    fn log(&mut self, data: LogItem);

    // dump the entire log
    fn dump(&self) -> Result<(), Box<dyn Error>>;

    // check whether logging is possible. Could check
    // e.g. whether directories exist. if try_to_fix, then
    // the Logger will try to resolve the issue, e.g. by
    // creating the dir
    fn check_can_log(&self, try_to_fix: bool) -> Result<(), &str>;

    fn print_last(&self);
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogData {
    String(String),
    Float(f32),
    Int(i32),
}

#[derive(Debug, Clone, Default)]
pub struct LogItem {
    items: HashMap<String, LogData>,
}

impl LogItem {
    pub fn push(mut self, k: String, v: LogData) -> Self {
        self.items.insert(k, v);

        self
    }

    pub fn get(&self, k: &str) -> Option<&LogData> {
        self.items.get(k)
    }

    pub fn combine(&mut self, other: LogItem) {
        other.items.into_iter().for_each(|(k, v)| {
            self.items.insert(k, v);
        });
    }
}

impl From<EvalResult> for LogItem {
    fn from(value: EvalResult) -> Self {
        LogItem::default()
            .push(
                "eval_ep_mean_len".to_string(),
                LogData::Float(value.mean_len),
            )
            .push(
                "eval_ep_mean_rew".to_string(),
                LogData::Float(value.mean_reward),
            )
            .push(
                "eval_ep_premature_frac".to_string(),
                LogData::Float(value.premature_fraction),
            )
    }
}

pub struct CsvLogger {
    overwrite: bool,
    dump_path: PathBuf,
    to_stdout: bool,
    data: Vec<LogItem>,
}

impl CsvLogger {
    pub fn new(dump_path: PathBuf, to_stdout: bool, overwrite: bool) -> Self {
        Self {
            dump_path,
            to_stdout,
            data: Vec::new(),
            overwrite,
        }
    }
}

impl Logger for CsvLogger {
    fn log(&mut self, data: LogItem) {
        if self.to_stdout {
            println!("{:?}", data);
        }

        if data.items.is_empty() {
            return;
        }

        self.data.push(data);
    }

    fn dump(&self) -> Result<(), Box<dyn Error>> {
        tracing::info!(
            path = ?self.dump_path,
            items = self.data.len(),
            "dumping logs"
        );

        let mut wtr = Writer::from_path(&self.dump_path)?;

        // union of all keys, in a stable column order
        let headers: Vec<&String> = self
            .data
            .iter()
            .flat_map(|record| record.items.keys())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        wtr.write_record(&headers)?;

        for record in &self.data {
            let row: Vec<String> = headers
                .iter()
                .map(|key| match record.items.get(*key) {
                    Some(LogData::String(s)) => s.clone(),
                    Some(LogData::Float(f)) => f.to_string(),
                    Some(LogData::Int(i)) => i.to_string(),
                    None => String::new(),
                })
                .collect();
            wtr.write_record(&row)?;
        }

        wtr.flush()?;

        Ok(())
    }

    fn check_can_log(&self, try_to_fix: bool) -> Result<(), &str> {
        let parent = match self.dump_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        if self.dump_path.exists() && !self.overwrite {
            Err("logger dump file already exists")
        } else if self.dump_path.extension() != Some(OsStr::new("csv")) {
            Err("logger dump path should be a csv")
        } else if !parent.exists() {
            if try_to_fix {
                std::fs::create_dir_all(parent).map_err(|_| "Couldn't create directory")
            } else {
                Err("logger dump path dir does not exist")
            }
        } else {
            Ok(())
        }
    }

    fn print_last(&self) {
        println!("Last Log:");
        if let Some(log) = self.data.last() {
            for (key, record) in &log.items {
                println!("\t{key}: {:#?}", record);
            }
        }
    }
}
