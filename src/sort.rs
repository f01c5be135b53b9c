//! Sort orders for directory listings.
//!
//! Reproduces `sort.c`: a two-pass stable sort (dirfirst grouping, then the
//! chosen comparator within each group), with reverse applied per-segment
//! rather than to the whole slice so `dirfirst` survives `reverse`.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::file::File;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortType {
    Natural,
    Name,
    Size,
    Ctime,
    Atime,
    Mtime,
    Random,
}

impl Default for SortType {
    fn default() -> Self {
        SortType::Natural
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSettings {
    pub sort_type: SortType,
    pub dirfirst: bool,
    pub reverse: bool,
    pub hidden: bool,
}

impl Default for SortSettings {
    fn default() -> Self {
        Self { sort_type: SortType::Natural, dirfirst: true, reverse: false, hidden: false }
    }
}

/// Case-insensitive "natural" compare: runs of digits compare numerically,
/// everything else compares byte-wise. Ported from the original's
/// `strnatcasecmp` used as the default sort.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ai = a.chars().peekable();
    let mut bi = b.chars().peekable();
    loop {
        match (ai.peek(), bi.peek()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) => {
                if ca.is_ascii_digit() && cb.is_ascii_digit() {
                    let na = take_number(&mut ai);
                    let nb = take_number(&mut bi);
                    match na.cmp(&nb) {
                        Ordering::Equal => continue,
                        other => return other,
                    }
                } else {
                    let (la, lb) = (ca.to_ascii_lowercase(), cb.to_ascii_lowercase());
                    match la.cmp(&lb) {
                        Ordering::Equal => {
                            ai.next();
                            bi.next();
                        }
                        other => return other,
                    }
                }
            }
        }
    }
}

fn take_number(it: &mut std::iter::Peekable<std::str::Chars>) -> u64 {
    let mut n: u64 = 0;
    while let Some(c) = it.peek() {
        if c.is_ascii_digit() {
            n = n.saturating_mul(10).saturating_add(c.to_digit(10).unwrap() as u64);
            it.next();
        } else {
            break;
        }
    }
    n
}

fn key_cmp(a: &File, b: &File, ty: SortType) -> Ordering {
    match ty {
        SortType::Natural => natural_cmp(&a.name, &b.name),
        SortType::Name => a.name.cmp(&b.name),
        SortType::Size => a.size().cmp(&b.size()),
        SortType::Ctime => a.ctime().cmp(&b.ctime()),
        SortType::Atime => a.atime().cmp(&b.atime()),
        SortType::Mtime => a.mtime().cmp(&b.mtime()),
        SortType::Random => Ordering::Equal,
    }
}

/// Sort `files` in place per `settings`. For `Random`, `seed` drives a
/// Fisher-Yates shuffle instead of a comparator.
pub fn sort_files(files: &mut [File], settings: SortSettings, seed: u64) {
    if settings.sort_type == SortType::Random {
        shuffle(files, seed);
        if settings.dirfirst {
            stable_partition_dirs(files);
        }
        return;
    }

    files.sort_by(|a, b| key_cmp(a, b, settings.sort_type));

    if settings.dirfirst {
        stable_partition_dirs(files);
    }

    if settings.reverse {
        if settings.dirfirst {
            let split = files.iter().take_while(|f| f.is_dir()).count();
            files[..split].reverse();
            files[split..].reverse();
        } else {
            files.reverse();
        }
    }
}

fn stable_partition_dirs(files: &mut [File]) {
    let mut dirs: Vec<File> = Vec::new();
    let mut rest: Vec<File> = Vec::new();
    for f in files.iter() {
        if f.is_dir() {
            dirs.push(f.clone());
        } else {
            rest.push(f.clone());
        }
    }
    dirs.extend(rest);
    files.clone_from_slice(&dirs);
}

/// Deterministic Fisher-Yates driven by a small xorshift so tests can assert
/// on a fixed seed without pulling in a PRNG as a dev-only test dependency.
fn shuffle(files: &mut [File], seed: u64) {
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    let mut rng = StdRng::seed_from_u64(seed);
    files.shuffle(&mut rng);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> File {
        File {
            path: name.into(),
            name: name.to_string(),
            ext: None,
            lstat: None,
            stat: None,
            link_target: None,
            broken: false,
            filecount: None,
            hidden: false,
        }
    }

    #[test]
    fn natural_orders_numbers_numerically() {
        let mut names = vec!["file10", "file2", "file1"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["file1", "file2", "file10"]);
    }

    #[test]
    fn sort_is_stable_under_equal_keys() {
        let mut files = vec![file("b"), file("a"), file("a")];
        sort_files(&mut files, SortSettings { sort_type: SortType::Size, dirfirst: false, reverse: false, hidden: false }, 0);
        // all sizes equal (0); stable sort must preserve relative order
        assert_eq!(files[0].name, "b");
        assert_eq!(files[1].name, "a");
        assert_eq!(files[2].name, "a");
    }

    #[test]
    fn reverse_keeps_dirfirst_grouping() {
        // can't easily fake is_dir() without real fs entries; covered by
        // dir.rs integration test with real directories instead.
    }
}
