//! スプレッドシート入出力
//!
//! アップロードされた .xlsx / .csv を評価項目に変換し、
//! 評価結果を1シートの .xlsx として書き出す。

use crate::delimited;
use crate::error::{Error, Result};
use crate::types::{EvaluationItem, EvaluationProject, Factuality, Relevance};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const COL_ID: &str = "Id";
pub const COL_QUESTIONS: &str = "Questions";
pub const COL_ANSWERS: &str = "Answers";
pub const COL_ANSWER_LLM: &str = "Answer_LLM";
pub const COL_CONSENSUS: &str = "AGRICULTURE CONSENSUS";
pub const COL_RELEVANCE: &str = "RELEVANCE";
pub const COL_FACTUALITY: &str = "FACTUALITY";

pub const REQUIRED_COLUMNS: [&str; 4] = [COL_ID, COL_QUESTIONS, COL_ANSWERS, COL_ANSWER_LLM];

/// 出力列（順序固定）
pub const EXPORT_COLUMNS: [&str; 7] = [
    COL_ID,
    COL_QUESTIONS,
    COL_ANSWERS,
    COL_ANSWER_LLM,
    COL_CONSENSUS,
    COL_RELEVANCE,
    COL_FACTUALITY,
];

pub const EXPORT_SHEET_NAME: &str = "Evaluations";

/// 入力ファイル形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Xlsx,
    Csv,
}

impl SourceFormat {
    /// 拡張子から判定（大文字小文字は区別しない）
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "xlsx" => Ok(SourceFormat::Xlsx),
            "csv" => Ok(SourceFormat::Csv),
            _ => Err(Error::UnsupportedFormat(
                path.file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string()),
            )),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SourceFormat::Xlsx => "Excel",
            SourceFormat::Csv => "CSV",
        }
    }
}

/// ファイル名（拡張子なし）をプロジェクト名の初期値にする
pub fn default_project_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// セル値（型はゆるく保持）
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// 文字列化（整数値の浮動小数は小数部なし）
    pub fn to_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Bool(b) => b.to_string(),
        }
    }
}

/// ファイルを読み込んで評価項目に変換
pub fn import_file(path: &Path) -> Result<Vec<EvaluationItem>> {
    let format = SourceFormat::from_path(path)?;
    let bytes = std::fs::read(path)?;
    parse_tabular(format, &bytes)
}

/// ファイルからプロジェクトを作成（名前省略時はファイル名の語幹）
pub fn import_project(path: &Path, name: Option<&str>) -> Result<EvaluationProject> {
    let items = import_file(path)?;
    let name = name.map(str::to_string).unwrap_or_else(|| default_project_name(path));
    EvaluationProject::from_items(&name, items)
}

/// 読み込み済みバイト列からプロジェクトを作成
pub fn project_from_bytes(format: SourceFormat, bytes: &[u8], name: &str) -> Result<EvaluationProject> {
    let items = parse_tabular(format, bytes)?;
    EvaluationProject::from_items(name, items)
}

/// バイト列を評価項目に変換
pub fn parse_tabular(format: SourceFormat, bytes: &[u8]) -> Result<Vec<EvaluationItem>> {
    let rows = match format {
        SourceFormat::Xlsx => read_xlsx_rows(bytes)?,
        SourceFormat::Csv => read_csv_rows(bytes)?,
    };
    let items = rows_to_items(rows)?;
    info!(format = format.label(), count = items.len(), "parsed evaluation items");
    Ok(items)
}

fn read_csv_rows(bytes: &[u8]) -> Result<Vec<Vec<Cell>>> {
    let text = String::from_utf8_lossy(bytes);
    let records = delimited::parse_records(&text)?;
    Ok(records
        .into_iter()
        .map(|record| {
            record
                .into_iter()
                .map(|s| if s.is_empty() { Cell::Empty } else { Cell::Text(s) })
                .collect()
        })
        .collect())
}

#[cfg(feature = "excel")]
fn read_xlsx_rows(bytes: &[u8]) -> Result<Vec<Vec<Cell>>> {
    use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
    use std::io::Cursor;

    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).map_err(|e| {
        warn!("failed to open workbook: {}", e);
        Error::Parse(SourceFormat::Xlsx.label().to_string())
    })?;

    // 先頭シートのみ対象
    let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
        return Err(Error::EmptyDataset);
    };
    let range = workbook.worksheet_range(&sheet_name).map_err(|e| {
        warn!("failed to read sheet {}: {}", sheet_name, e);
        Error::Parse(SourceFormat::Xlsx.label().to_string())
    })?;

    let rows = range
        .rows()
        .map(|row| {
            row.iter()
                .map(|data| match data {
                    Data::Empty => Cell::Empty,
                    Data::String(s) if s.is_empty() => Cell::Empty,
                    Data::String(s) => Cell::Text(s.clone()),
                    Data::Int(i) => Cell::Number(*i as f64),
                    Data::Float(f) => Cell::Number(*f),
                    Data::Bool(b) => Cell::Bool(*b),
                    other => Cell::Text(other.to_string()),
                })
                .collect()
        })
        .collect();
    Ok(rows)
}

#[cfg(not(feature = "excel"))]
fn read_xlsx_rows(_bytes: &[u8]) -> Result<Vec<Vec<Cell>>> {
    Err(Error::UnsupportedFormat("xlsx".to_string()))
}

static EMPTY_CELL: Cell = Cell::Empty;

/// ヘッダー行の列位置
struct ColumnMap {
    id: usize,
    question: usize,
    answer: usize,
    answer_llm: usize,
    consensus: Option<usize>,
    relevance: Option<usize>,
    factuality: Option<usize>,
}

impl ColumnMap {
    fn from_header(header: &[Cell]) -> Result<Self> {
        let names: Vec<String> = header.iter().map(|c| c.to_text().trim().to_string()).collect();
        let find = |name: &str| names.iter().position(|n| n == name);
        let require = |name: &str| find(name).ok_or_else(|| Error::MissingColumn(name.to_string()));

        Ok(Self {
            id: require(COL_ID)?,
            question: require(COL_QUESTIONS)?,
            answer: require(COL_ANSWERS)?,
            answer_llm: require(COL_ANSWER_LLM)?,
            consensus: find(COL_CONSENSUS),
            relevance: find(COL_RELEVANCE),
            factuality: find(COL_FACTUALITY),
        })
    }

    fn to_item(&self, row: &[Cell]) -> EvaluationItem {
        let cell = |idx: usize| row.get(idx).unwrap_or(&EMPTY_CELL);
        let optional = |idx: Option<usize>| idx.map(cell).filter(|c| !c.is_empty());

        let id = cell(self.id).to_text();
        let consensus = optional(self.consensus).and_then(|c| coerce_consensus(c, &id));
        let relevance = optional(self.relevance).and_then(|c| coerce_relevance(c, &id));
        let factuality = optional(self.factuality).and_then(|c| coerce_factuality(c, &id));

        EvaluationItem::new(
            id,
            cell(self.question).to_text(),
            cell(self.answer).to_text(),
            cell(self.answer_llm).to_text(),
        )
        .with_judgments(consensus, relevance, factuality)
    }
}

fn rows_to_items(rows: Vec<Vec<Cell>>) -> Result<Vec<EvaluationItem>> {
    let mut rows = rows
        .into_iter()
        .filter(|row| !row.iter().all(Cell::is_empty));

    let Some(header) = rows.next() else {
        return Err(Error::EmptyDataset);
    };
    let columns = ColumnMap::from_header(&header)?;

    let items: Vec<EvaluationItem> = rows.map(|row| columns.to_item(&row)).collect();
    if items.is_empty() {
        return Err(Error::EmptyDataset);
    }
    debug!("{} data rows after header", items.len());
    Ok(items)
}

fn coerce_consensus(cell: &Cell, id: &str) -> Option<bool> {
    let value = match cell {
        Cell::Bool(b) => Some(*b),
        Cell::Number(n) => Some(*n != 0.0),
        Cell::Text(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        Cell::Empty => None,
    };
    if value.is_none() {
        warn!(id, column = COL_CONSENSUS, "ignoring unrecognized value {:?}", cell);
    }
    value
}

fn coerce_relevance(cell: &Cell, id: &str) -> Option<Relevance> {
    let value = match cell {
        Cell::Number(n) => Relevance::from_number(*n),
        Cell::Text(s) => Relevance::parse_loose(s),
        _ => None,
    };
    if value.is_none() {
        warn!(id, column = COL_RELEVANCE, "ignoring unrecognized value {:?}", cell);
    }
    value
}

fn coerce_factuality(cell: &Cell, id: &str) -> Option<Factuality> {
    let value = cell.to_text().parse::<Factuality>().ok();
    if value.is_none() {
        warn!(id, column = COL_FACTUALITY, "ignoring unrecognized value {:?}", cell);
    }
    value
}

/// 出力ファイル名: `<projectName>_evaluations_<YYYY-MM-DD>.xlsx`
pub fn export_file_name(project_name: &str, date: NaiveDate) -> String {
    // パス区切りなどファイル名に使えない文字は置換
    let safe: String = project_name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect();
    format!("{}_evaluations_{}.xlsx", safe, date.format("%Y-%m-%d"))
}

/// 評価結果を .xlsx バッファに書き出し
#[cfg(feature = "excel")]
pub fn serialize_tabular(items: &[EvaluationItem]) -> Result<Vec<u8>> {
    use rust_xlsxwriter::{Format, Workbook};

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(EXPORT_SHEET_NAME)?;

    for (col, name) in EXPORT_COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *name, &header_format)?;
    }

    for (i, item) in items.iter().enumerate() {
        let row = (i + 1) as u32;
        worksheet.write_string(row, 0, &item.id)?;
        worksheet.write_string(row, 1, &item.question)?;
        worksheet.write_string(row, 2, &item.answer)?;
        worksheet.write_string(row, 3, &item.answer_llm)?;

        // 未判定のセルは空のまま
        if let Some(consensus) = item.agriculture_consensus() {
            worksheet.write_boolean(row, 4, consensus)?;
        }
        if let Some(relevance) = item.relevance() {
            worksheet.write_string(row, 5, relevance.label())?;
        }
        if let Some(factuality) = item.factuality() {
            worksheet.write_string(row, 6, factuality.stored_value())?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// 評価結果をディレクトリに書き出し、出力パスを返す
#[cfg(feature = "excel")]
pub fn write_export(items: &[EvaluationItem], project_name: &str, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let file_name = export_file_name(project_name, chrono::Utc::now().date_naive());
    let path = output_dir.join(file_name);

    let buffer = serialize_tabular(items)?;
    std::fs::write(&path, buffer)?;
    info!(path = %path.display(), rows = items.len(), "exported evaluations");
    Ok(path)
}
