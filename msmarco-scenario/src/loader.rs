//! Readers for the delimited MS MARCO source files.
//!
//! Every reader is all-or-nothing: a row with the wrong number of columns or a
//! non-integer id fails the whole load, because partially typed reference data
//! would silently corrupt the evaluation labels.

use std::{
    collections::{BTreeMap, HashMap},
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
    str::FromStr,
};

use common::error::AppError;
use tracing::debug;

use crate::types::{PassageId, QueryId, Rank, RecordId, Relevance};

/// `id -> text`, used for both passages and queries.
pub type TextById = HashMap<RecordId, String>;
/// `query id -> passage id -> relevance`.
pub type QrelsByQuery = BTreeMap<QueryId, BTreeMap<PassageId, Relevance>>;
/// `query id -> rank -> passage id`.
pub type RankingByQuery = BTreeMap<QueryId, BTreeMap<Rank, PassageId>>;

/// Reads `<id>\t<text>` rows. Later rows win when an id repeats.
pub fn load_id_text(path: &Path) -> Result<TextById, AppError> {
    let reader = open(path)?;
    parse_id_text(reader, &path.display().to_string())
}

/// Reads `<qid> <ignored> <pid> <relevance>` rows split on `delimiter`.
pub fn load_qrels(path: &Path, delimiter: char) -> Result<QrelsByQuery, AppError> {
    let reader = open(path)?;
    parse_qrels(reader, delimiter, &path.display().to_string())
}

/// Reads `<qid>\t<pid>\t<rank>` rows.
pub fn load_topk(path: &Path) -> Result<RankingByQuery, AppError> {
    let reader = open(path)?;
    parse_topk(reader, &path.display().to_string())
}

pub fn parse_id_text<R: BufRead>(reader: R, source: &str) -> Result<TextById, AppError> {
    let mut items = HashMap::new();
    for_each_row::<_, 2, _>(reader, '\t', source, |[id, text], line| {
        let id: RecordId = parse_field(id, "id", source, line)?;
        items.insert(id, text.to_string());
        Ok(())
    })?;
    debug!(source, rows = items.len(), "Loaded id/text file");
    Ok(items)
}

pub fn parse_qrels<R: BufRead>(
    reader: R,
    delimiter: char,
    source: &str,
) -> Result<QrelsByQuery, AppError> {
    let mut qrels: QrelsByQuery = BTreeMap::new();
    for_each_row::<_, 4, _>(reader, delimiter, source, |[qid, _, pid, relevance], line| {
        let qid: QueryId = parse_field(qid, "query id", source, line)?;
        let pid: PassageId = parse_field(pid, "passage id", source, line)?;
        let relevance: Relevance = parse_field(relevance, "relevance", source, line)?;
        qrels.entry(qid).or_default().insert(pid, relevance);
        Ok(())
    })?;
    debug!(source, queries = qrels.len(), "Loaded qrels file");
    Ok(qrels)
}

pub fn parse_topk<R: BufRead>(reader: R, source: &str) -> Result<RankingByQuery, AppError> {
    let mut rankings: RankingByQuery = BTreeMap::new();
    for_each_row::<_, 3, _>(reader, '\t', source, |[qid, pid, rank], line| {
        let qid: QueryId = parse_field(qid, "query id", source, line)?;
        let pid: PassageId = parse_field(pid, "passage id", source, line)?;
        let rank: Rank = parse_field(rank, "rank", source, line)?;
        rankings.entry(qid).or_default().insert(rank, pid);
        Ok(())
    })?;
    debug!(source, queries = rankings.len(), "Loaded top-k file");
    Ok(rankings)
}

fn open(path: &Path) -> Result<BufReader<File>, AppError> {
    let file = File::open(path).map_err(|err| {
        AppError::NotFound(format!("opening {}: {err}", path.display()))
    })?;
    Ok(BufReader::new(file))
}

/// Feeds every non-blank line, split into exactly `N` columns, to `handle`.
fn for_each_row<R, const N: usize, F>(
    reader: R,
    delimiter: char,
    source: &str,
    mut handle: F,
) -> Result<(), AppError>
where
    R: BufRead,
    F: FnMut([&str; N], usize) -> Result<(), AppError>,
{
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx.saturating_add(1);
        let raw = line.map_err(|err| parse_error(source, line_no, format!("reading line: {err}")))?;
        let raw = raw.trim_end_matches('\r');
        if raw.trim().is_empty() {
            continue;
        }

        let columns: Vec<&str> = raw.split(delimiter).collect();
        let found = columns.len();
        let row: [&str; N] = columns.try_into().map_err(|_| {
            parse_error(source, line_no, format!("expected {N} columns, found {found}"))
        })?;
        handle(row, line_no)?;
    }
    Ok(())
}

fn parse_field<T: FromStr>(raw: &str, what: &str, source: &str, line: usize) -> Result<T, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| parse_error(source, line, format!("invalid {what} '{raw}'")))
}

fn parse_error(source: &str, line: usize, message: String) -> AppError {
    AppError::Parse {
        path: source.to_string(),
        line,
        message,
    }
}
