use crate::error::Error;
use chrono::{DateTime, Local};
use nalgebra as na;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Base name for everything a session writes: `YYYY_MM_DD_HH_MM_SS`
pub fn session_name(start: &DateTime<Local>) -> String {
    start.format("%Y_%m_%d_%H_%M_%S").to_string()
}

/// One line of the session log
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub time: DateTime<Local>,
    pub center: na::Point2<i32>,
    pub height: f32,
    pub width: f32,
    pub status: i32,
}

impl Record {
    pub fn timestamp(&self) -> String {
        self.time.format("%Y%m%d%H%M%S").to_string()
    }
}

pub struct SessionLog<W: Write> {
    out: BufWriter<W>,
}

impl SessionLog<Box<dyn Write>> {
    /// Create `<dir>/<name>.txt`, making `dir` if needed
    pub fn create<P: AsRef<Path>>(dir: P, name: &str) -> Result<Self, Error> {
        std::fs::create_dir_all(dir.as_ref())?;
        let path: PathBuf = dir.as_ref().join(format!("{}.txt", name));

        Ok(Self::new(Box::new(File::create(path)?)))
    }
}

impl<W: Write> SessionLog<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: BufWriter::new(out),
        }
    }

    pub fn append(&mut self, rec: &Record) -> Result<(), Error> {
        writeln!(
            self.out,
            "{} {} {} {} {} {}",
            rec.timestamp(),
            rec.center.x,
            rec.center.y,
            rec.height,
            rec.width,
            rec.status
        )?;

        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), Error> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W, Error> {
        self.out
            .into_inner()
            .map_err(|e| Error::IoError(e.into_error()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn moment() -> DateTime<Local> {
        Local.with_ymd_and_hms(2017, 10, 25, 21, 32, 5).unwrap()
    }

    #[test]
    fn names_from_start_time() {
        assert_eq!(session_name(&moment()), "2017_10_25_21_32_05");
    }

    #[test]
    fn record_line_layout() {
        let mut log = SessionLog::new(Vec::new());
        log.append(&Record {
            time: moment(),
            center: na::Point2::new(320, 241),
            height: 35.5,
            width: 12.0,
            status: 2,
        })
        .unwrap();

        let text = String::from_utf8(log.into_inner().unwrap()).unwrap();
        assert_eq!(text, "20171025213205 320 241 35.5 12 2\n");
    }

    #[test]
    fn creates_named_file() {
        let dir = std::env::temp_dir().join(format!("buoytrack-log-{}", std::process::id()));
        let name = session_name(&moment());

        let mut log = SessionLog::create(&dir, &name).unwrap();
        log.append(&Record {
            time: moment(),
            center: na::Point2::new(1, 2),
            height: 3.0,
            width: 4.0,
            status: 0,
        })
        .unwrap();
        log.flush().unwrap();

        let path = dir.join("2017_10_25_21_32_05.txt");
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(text, "20171025213205 1 2 3 4 0\n");
    }
}
