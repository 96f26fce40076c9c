use chrono::Local;
use env_logger::Builder;
use log::Level;
use std::io::Write;

/// Install the process logger, `info` unless `RUST_LOG` says otherwise
pub fn init() {
    Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let time = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            let color = match record.level() {
                Level::Error => "\x1b[31m",
                Level::Warn => "\x1b[33m",
                Level::Info => "\x1b[32m",
                Level::Debug => "\x1b[36m",
                Level::Trace => "\x1b[90m",
            };
            writeln!(
                buf,
                "{} {}{:<5}\x1b[0m [{}] {}",
                time,
                color,
                record.level(),
                record.target(),
                record.args(),
            )
        })
        .init();
}
