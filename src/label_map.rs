//! Bijection between string labels and dense numeric codes
//!
//! Codes are assigned in sorted label order, so any two sessions that saw the
//! same label set agree on them. Persisted codes are still only meaningful
//! together with the sidecar file written next to the model.

use crate::core::{Result, SVMError};
use log::debug;
use std::collections::{BTreeSet, HashMap};
use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Suffix appended to a model path to name its label file
pub const LABEL_SUFFIX: &str = ".labels";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    codes: HashMap<String, usize>,
    /// Labels indexed by code
    labels: Vec<String>,
}

impl LabelMap {
    /// Map built from the distinct labels in `labels`
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let distinct: BTreeSet<String> = labels.into_iter().map(Into::into).collect();
        let labels: Vec<String> = distinct.into_iter().collect();
        let codes = labels
            .iter()
            .enumerate()
            .map(|(code, label)| (label.clone(), code))
            .collect();
        Self { codes, labels }
    }

    pub fn code(&self, label: &str) -> Option<usize> {
        self.codes.get(label).copied()
    }

    pub fn label(&self, code: usize) -> Option<&str> {
        self.labels.get(code).map(String::as_str)
    }

    /// Label of a numeric prediction
    ///
    /// Anything but an integral code in `[0, len)` means the solver and the
    /// session disagree about the label set.
    pub fn decode(&self, value: f64) -> Result<&str> {
        if value.fract() != 0.0 || value < 0.0 || value >= self.labels.len() as f64 {
            return Err(SVMError::UnknownNumericLabel(value));
        }
        self.label(value as usize)
            .ok_or(SVMError::UnknownNumericLabel(value))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// `(label, code)` pairs in code order
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.labels
            .iter()
            .enumerate()
            .map(|(code, label)| (label.as_str(), code))
    }

    /// Write one `label:code` line per label
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        for (label, code) in self.iter() {
            if label.contains('\n') || label.contains('\r') {
                return Err(SVMError::InvalidLabel(format!(
                    "Label {:?} contains a line break",
                    label
                )));
            }
            writeln!(writer, "{}:{}", label, code)?;
        }
        Ok(())
    }

    /// Parse `label:code` lines
    ///
    /// The label ends at the last colon, so labels may contain colons. Codes
    /// must cover `[0, n)` exactly once.
    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        let mut slots: Vec<Option<String>> = Vec::new();
        let mut entries = Vec::new();
        let mut line_no = 0;

        for line in BufReader::new(reader).lines() {
            let line = line?;
            line_no += 1;
            if line.is_empty() {
                continue;
            }
            let (label, code) = line.rsplit_once(':').ok_or_else(|| {
                SVMError::MalformedLabelFile {
                    line: line_no,
                    reason: "missing ':' separator".to_string(),
                }
            })?;
            let code: usize = code.trim().parse().map_err(|_| SVMError::MalformedLabelFile {
                line: line_no,
                reason: format!("invalid code {:?}", code),
            })?;
            entries.push((line_no, label.to_string(), code));
        }
        if entries.is_empty() {
            return Err(SVMError::MalformedLabelFile {
                line: line_no.max(1),
                reason: "no labels".to_string(),
            });
        }

        slots.resize(entries.len(), None);
        for (line_no, label, code) in entries {
            let slot = slots.get_mut(code).ok_or_else(|| SVMError::MalformedLabelFile {
                line: line_no,
                reason: format!("code {} out of range", code),
            })?;
            if slot.is_some() {
                return Err(SVMError::MalformedLabelFile {
                    line: line_no,
                    reason: format!("duplicate code {}", code),
                });
            }
            *slot = Some(label);
        }

        // n entries with n distinct codes below n fill every slot
        let labels: Vec<String> = slots.into_iter().flatten().collect();
        let mut codes = HashMap::with_capacity(labels.len());
        for (code, label) in labels.iter().enumerate() {
            if codes.insert(label.clone(), code).is_some() {
                return Err(SVMError::MalformedLabelFile {
                    line: code + 1,
                    reason: format!("duplicate label {:?}", label),
                });
            }
        }
        Ok(Self { codes, labels })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        debug!(
            "Wrote {} labels to {}",
            self.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Read a label file; a missing file is an I/O error
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("{}: {}", path.as_ref().display(), e),
            )
        })?;
        Self::read_from(file)
    }
}

/// Label file belonging to the model at `model_path`
pub fn sidecar_path<P: AsRef<Path>>(model_path: P) -> PathBuf {
    let mut path = OsString::from(model_path.as_ref().as_os_str());
    path.push(LABEL_SUFFIX);
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bijection() {
        let map = LabelMap::from_labels(["firefox", "chrome", "curl", "chrome"]);
        assert_eq!(map.len(), 3);
        for label in ["firefox", "chrome", "curl"] {
            let code = map.code(label).unwrap();
            assert_eq!(map.label(code), Some(label));
        }
        let mut codes: Vec<usize> = map.iter().map(|(_, code)| code).collect();
        codes.sort();
        assert_eq!(codes, vec![0, 1, 2]);
    }

    #[test]
    fn test_order_independent() {
        let a = LabelMap::from_labels(["b", "a", "c"]);
        let b = LabelMap::from_labels(["c", "b", "a", "a"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_decode() {
        let map = LabelMap::from_labels(["x", "y"]);
        assert_eq!(map.decode(1.0).unwrap(), "y");
        for bad in [2.0, -1.0, 0.5, f64::NAN] {
            assert!(matches!(
                map.decode(bad),
                Err(SVMError::UnknownNumericLabel(_))
            ));
        }
    }

    #[test]
    fn test_sidecar_format() {
        let map = LabelMap::from_labels(["beta", "alpha"]);
        let mut out = Vec::new();
        map.write_to(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "alpha:0\nbeta:1\n");
    }

    #[test]
    fn test_labels_with_colons() {
        let map = LabelMap::from_labels(["host:8080", "plain"]);
        let mut out: Vec<u8> = Vec::new();
        map.write_to(&mut out).unwrap();

        let read = LabelMap::read_from(out.as_slice()).unwrap();
        assert_eq!(read, map);
        assert_eq!(read.code("host:8080"), Some(0));
    }

    #[test]
    fn test_rejects_line_breaks() {
        let map = LabelMap::from_labels(["two\nlines"]);
        assert!(matches!(
            map.write_to(&mut Vec::<u8>::new()),
            Err(SVMError::InvalidLabel(_))
        ));
    }

    #[test]
    fn test_malformed_files() {
        for (text, line) in [
            ("a:0\nb\n", 2),
            ("a:zero\n", 1),
            ("a:0\nb:0\n", 2),
            ("a:0\nb:5\n", 2),
            ("", 1),
            ("\n\n\n", 3),
        ] {
            match LabelMap::read_from(text.as_bytes()) {
                Err(SVMError::MalformedLabelFile { line: l, .. }) => assert_eq!(l, line, "{text:?}"),
                other => panic!("expected malformed label file for {text:?}, got {other:?}"),
            }
        }
        assert!(matches!(
            LabelMap::read_from("a:0\na:1\n".as_bytes()),
            Err(SVMError::MalformedLabelFile { .. })
        ));
    }

    #[test]
    fn test_sidecar_path() {
        assert_eq!(
            sidecar_path("models/ua.model"),
            PathBuf::from("models/ua.model.labels")
        );
    }
}
