//! Table detection from positioned text and ruling lines.
//!
//! Runs a four-pass hybrid pipeline: row grouping, header isolation,
//! column-boundary candidate generation (whitespace projection, edge
//! clustering, header-region clustering, ruling-line anchoring), and
//! row-voting consolidation. Generalizes the column/row alignment
//! analysis used elsewhere in this module to dense tabular regions.

use crate::geometry::Rect;
use crate::layout::text_block::{Color, FontWeight, TextSpan};

/// A thin drawn line interpreted as a table border.
///
/// Horizontal and vertical classification follows a tolerance test rather
/// than requiring an exactly axis-aligned segment, since extracted path
/// geometry is rarely perfectly straight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RulingLine {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl RulingLine {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// `|dy| < 5 && |dx| > 5`.
    pub fn is_horizontal(&self) -> bool {
        (self.y1 - self.y0).abs() < 5.0 && (self.x1 - self.x0).abs() > 5.0
    }

    /// Symmetric test: `|dx| < 5 && |dy| > 5`.
    pub fn is_vertical(&self) -> bool {
        (self.x1 - self.x0).abs() < 5.0 && (self.y1 - self.y0).abs() > 5.0
    }

    fn min_x(&self) -> f32 {
        self.x0.min(self.x1)
    }
}

/// Classification of a detected table's structural regularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableType {
    /// At least 90% of data rows have the expected column count, within ±1.
    Regular,
    /// Fewer than 90% of data rows match the expected column count.
    Irregular,
}

/// A detected table region: a dense 2-D array of cell strings.
#[derive(Debug, Clone)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
    pub row_count: usize,
    pub column_count: usize,
    pub page_index: usize,
    pub bbox: Rect,
    pub table_type: TableType,
    /// Fraction of data rows matching the expected column count ±1.
    pub consistency: f32,
}

impl Table {
    /// Re-render this table's cells as positioned `TextSpan`s, one span per
    /// non-empty cell, laid out on a uniform grid. Feeding the result back
    /// into [`detect_tables`] must recover an identical table, which is
    /// what makes the detector idempotent on its own output.
    pub fn to_text_elements(&self) -> Vec<TextSpan> {
        const COL_PITCH: f32 = 80.0;
        const ROW_PITCH: f32 = 20.0;

        let mut spans = Vec::new();
        let mut sequence = 0;
        for (row_idx, row) in self.rows.iter().enumerate() {
            for (col_idx, cell) in row.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                let x = self.bbox.x + col_idx as f32 * COL_PITCH;
                let y = self.bbox.y - row_idx as f32 * ROW_PITCH;
                spans.push(mock_span(cell, x, y, sequence));
                sequence += 1;
            }
        }
        spans
    }
}

fn mock_span(text: &str, x: f32, y: f32, sequence: usize) -> TextSpan {
    let width = (text.chars().count() as f32 * 6.0).max(6.0);
    TextSpan {
        text: text.to_string(),
        bbox: Rect::new(x, y, width, 12.0),
        font_name: "Helvetica".to_string(),
        font_size: 12.0,
        font_weight: FontWeight::Normal,
        is_italic: false,
        color: Color::black(),
        mcid: None,
        sequence,
        split_boundary_before: false,
        offset_semantic: false,
        char_spacing: 0.0,
        word_spacing: 0.0,
        horizontal_scaling: 100.0,
        primary_detected: false,
    }
}

/// Tunable thresholds for the detection pipeline. Defaults are the values
/// named in the source algorithm.
#[derive(Debug, Clone, Copy)]
pub struct TableDetectorConfig {
    pub min_column_width: f32,
    pub min_gap_width: f32,
    pub support_threshold: f32,
    pub ruling_line_match: f32,
    pub wide_region_threshold: f32,
    pub max_header_rows: usize,
}

impl Default for TableDetectorConfig {
    fn default() -> Self {
        Self {
            min_column_width: 30.0,
            min_gap_width: 10.0,
            support_threshold: 0.20,
            ruling_line_match: 20.0,
            wide_region_threshold: 100.0,
            max_header_rows: 10,
        }
    }
}

/// Detect tables using default thresholds and no ruling-line input.
pub fn detect_tables(elements: &[TextSpan], page_index: usize) -> Vec<Table> {
    detect_tables_with_config(elements, &[], page_index, &TableDetectorConfig::default())
}

/// Detect tables, folding in extracted ruling lines and custom thresholds.
///
/// Never fails: if no column boundaries emerge the whole region collapses
/// into a single-column table.
pub fn detect_tables_with_config(
    elements: &[TextSpan],
    ruling_lines: &[RulingLine],
    page_index: usize,
    config: &TableDetectorConfig,
) -> Vec<Table> {
    if elements.is_empty() {
        return vec![];
    }

    let rows = group_rows(elements);
    if rows.len() < 2 {
        return vec![];
    }

    let header_row_count = isolate_header_rows(&rows).min(config.max_header_rows);
    let data_rows = &rows[header_row_count..];
    if data_rows.is_empty() {
        return vec![];
    }

    let informative_headers = informative_header_rows(&rows[..header_row_count]);

    let mut boundaries =
        column_boundary_candidates(elements, &informative_headers, ruling_lines, config);
    boundaries = consolidate_boundaries(&boundaries, data_rows, elements, config);
    boundaries.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let (cell_rows, row_count, column_count) = extract_cells(elements, &rows, &boundaries);

    let mut bbox = elements[0].bbox;
    for el in elements {
        bbox = bbox.union(&el.bbox);
    }

    let data_cell_rows = &cell_rows[header_row_count.min(cell_rows.len())..];
    let (table_type, consistency) = classify(data_cell_rows, column_count);

    vec![Table {
        rows: cell_rows,
        row_count,
        column_count,
        page_index,
        bbox,
        table_type,
        consistency,
    }]
}

/// Pass 1: cluster elements by Y with tolerance = 0.5 × average font size.
/// Returns rows top-to-bottom, each a list of element indices sorted by X.
fn group_rows(elements: &[TextSpan]) -> Vec<Vec<usize>> {
    let avg_font_size = elements.iter().map(|e| e.font_size).sum::<f32>() / elements.len() as f32;
    let tolerance = avg_font_size * 0.5;

    let mut order: Vec<usize> = (0..elements.len()).collect();
    // Descending Y: top of the page first, matching this codebase's
    // top-to-bottom reading convention (PDF user space, Y increases upward).
    order.sort_by(|&a, &b| elements[b].bbox.y.partial_cmp(&elements[a].bbox.y).unwrap());

    let mut rows: Vec<Vec<usize>> = vec![];
    for idx in order {
        let y = elements[idx].bbox.y;
        let placed = rows.iter_mut().find(|row| {
            let row_y = elements[row[0]].bbox.y;
            (row_y - y).abs() <= tolerance
        });
        match placed {
            Some(row) => row.push(idx),
            None => rows.push(vec![idx]),
        }
    }

    for row in &mut rows {
        row.sort_by(|&a, &b| elements[a].bbox.x.partial_cmp(&elements[b].bbox.x).unwrap());
    }

    rows
}

/// Pass 2: identify leading rows whose element count is < 50% of the
/// maximum row count. Returns how many leading rows are header rows.
fn isolate_header_rows(rows: &[Vec<usize>]) -> usize {
    let max_count = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    if max_count == 0 {
        return 0;
    }

    let mut header_rows = 0;
    for row in rows {
        if (row.len() as f32) < 0.5 * max_count as f32 {
            header_rows += 1;
        } else {
            break;
        }
    }
    header_rows.min(rows.len().saturating_sub(1))
}

/// Among header rows, keep those with at least 50% of the max header
/// element count; these drive header-based column clustering.
fn informative_header_rows(header_rows: &[Vec<usize>]) -> Vec<usize> {
    let max_count = header_rows.iter().map(|r| r.len()).max().unwrap_or(0);
    if max_count == 0 {
        return vec![];
    }
    header_rows
        .iter()
        .filter(|r| (r.len() as f32) >= 0.5 * max_count as f32)
        .flatten()
        .copied()
        .collect()
}

/// Pass 3: generate column-boundary candidates from all strategies and
/// merge them into one candidate set for row-voting.
fn column_boundary_candidates(
    elements: &[TextSpan],
    informative_headers: &[usize],
    ruling_lines: &[RulingLine],
    config: &TableDetectorConfig,
) -> Vec<f32> {
    let mut candidates = whitespace_projection_boundaries(elements, config);

    if candidates.len() < 2 {
        candidates = edge_clustering_boundaries(elements, config);
    }

    if !informative_headers.is_empty() {
        let header_boundaries = header_region_boundaries(elements, informative_headers, config);
        for b in header_boundaries {
            if !candidates
                .iter()
                .any(|c| (c - b).abs() < config.min_gap_width / 2.0)
            {
                candidates.push(b);
            }
        }
    }

    let vertical_lines: Vec<f32> = ruling_lines
        .iter()
        .filter(|l| l.is_vertical())
        .map(|l| l.min_x())
        .collect();
    if !vertical_lines.is_empty() {
        candidates = anchor_to_ruling_lines(candidates, &vertical_lines, config);
    }

    let has_horizontal_ruling = ruling_lines.iter().any(|l| l.is_horizontal());
    if has_horizontal_ruling {
        candidates = subdivide_first_wide_region(candidates, elements, config);
    }

    candidates.sort_by(|a, b| a.partial_cmp(b).unwrap());
    candidates.dedup_by(|a, b| (*a - *b).abs() < 1.0);
    candidates
}

/// Primary strategy: a 1-pt-bin histogram of horizontal text coverage;
/// valleys of width >= min_gap_width are column gaps.
fn whitespace_projection_boundaries(elements: &[TextSpan], config: &TableDetectorConfig) -> Vec<f32> {
    let min_x = elements.iter().map(|e| e.bbox.left()).fold(f32::MAX, f32::min);
    let max_x = elements.iter().map(|e| e.bbox.right()).fold(f32::MIN, f32::max);
    if !(max_x > min_x) {
        return vec![];
    }

    let width = (max_x - min_x).ceil() as usize + 1;
    let mut coverage = vec![false; width];
    for el in elements {
        let start = (el.bbox.left() - min_x).floor().max(0.0) as usize;
        let end = ((el.bbox.right() - min_x).ceil() as usize).min(width);
        for bin in coverage.iter_mut().take(end).skip(start) {
            *bin = true;
        }
    }

    let mut gap_width = config.min_gap_width as usize;
    let mut valleys = find_valleys(&coverage, gap_width.max(1));
    if valleys.len() < 2 && gap_width > 1 {
        gap_width /= 2;
        valleys = find_valleys(&coverage, gap_width.max(1));
    }

    let mut boundaries = vec![];
    for (start, end) in valleys {
        boundaries.push(min_x + start as f32);
        boundaries.push(min_x + end as f32);
    }
    boundaries
}

fn find_valleys(coverage: &[bool], min_width: usize) -> Vec<(usize, usize)> {
    let mut valleys = vec![];
    let mut run_start = None;
    for (i, &covered) in coverage.iter().enumerate() {
        if !covered {
            if run_start.is_none() {
                run_start = Some(i);
            }
        } else if let Some(start) = run_start.take() {
            if i - start >= min_width {
                valleys.push((start, i));
            }
        }
    }
    if let Some(start) = run_start {
        if coverage.len() - start >= min_width {
            valleys.push((start, coverage.len()));
        }
    }
    valleys
}

/// Fallback: 1-D DBSCAN-like sweep over left/right edges, radius =
/// min_gap_width / 2.
fn edge_clustering_boundaries(elements: &[TextSpan], config: &TableDetectorConfig) -> Vec<f32> {
    let mut edges: Vec<f32> = elements
        .iter()
        .flat_map(|e| [e.bbox.left(), e.bbox.right()])
        .collect();
    edges.sort_by(|a, b| a.partial_cmp(b).unwrap());
    cluster_1d(&edges, config.min_gap_width / 2.0)
}

fn cluster_1d(sorted_values: &[f32], radius: f32) -> Vec<f32> {
    let mut clusters: Vec<Vec<f32>> = vec![];
    for &v in sorted_values {
        match clusters.last_mut() {
            Some(cluster) if v - cluster[cluster.len() - 1] <= radius => cluster.push(v),
            _ => clusters.push(vec![v]),
        }
    }
    clusters
        .into_iter()
        .map(|c| c.iter().sum::<f32>() / c.len() as f32)
        .collect()
}

/// Tabula-style: cluster the X starts of informative header elements with
/// epsilon = min_column_width / 3.
fn header_region_boundaries(
    elements: &[TextSpan],
    informative_headers: &[usize],
    config: &TableDetectorConfig,
) -> Vec<f32> {
    let mut starts: Vec<f32> = informative_headers
        .iter()
        .map(|&i| elements[i].bbox.left())
        .collect();
    starts.sort_by(|a, b| a.partial_cmp(b).unwrap());
    cluster_1d(&starts, config.min_column_width / 3.0)
}

/// Anchor candidate boundaries to vertical ruling-line X-positions,
/// replacing each anchor with the closest text-based boundary if that
/// boundary is within `ruling_line_match` points.
fn anchor_to_ruling_lines(candidates: Vec<f32>, ruling_x: &[f32], config: &TableDetectorConfig) -> Vec<f32> {
    ruling_x
        .iter()
        .map(|&rx| {
            candidates
                .iter()
                .min_by(|a, b| (*a - rx).abs().partial_cmp(&(*b - rx).abs()).unwrap())
                .filter(|&&c| (c - rx).abs() <= config.ruling_line_match)
                .copied()
                .unwrap_or(rx)
        })
        .collect()
}

/// If a horizontal ruling line is present, subdivide only the first region
/// wider than `wide_region_threshold` via edge clustering; other wide
/// regions are left as single columns.
fn subdivide_first_wide_region(
    candidates: Vec<f32>,
    elements: &[TextSpan],
    config: &TableDetectorConfig,
) -> Vec<f32> {
    if candidates.len() < 2 {
        return candidates;
    }
    let mut sorted = candidates.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());

    for window in sorted.windows(2) {
        let (left, right) = (window[0], window[1]);
        if right - left > config.wide_region_threshold {
            let region_elements: Vec<TextSpan> = elements
                .iter()
                .filter(|e| e.bbox.left() >= left && e.bbox.right() <= right)
                .cloned()
                .collect();
            if region_elements.len() < 2 {
                continue;
            }
            let sub = edge_clustering_boundaries(&region_elements, config);
            let mut result = candidates;
            result.extend(sub);
            return result;
        }
    }
    candidates
}

/// Pass 4: keep boundaries supported by >= 20% of data rows (an element's
/// left or right edge within `min_gap_width` of the boundary); fall back
/// to the full candidate set if fewer than 3 survive.
fn consolidate_boundaries(
    candidates: &[f32],
    data_rows: &[Vec<usize>],
    elements: &[TextSpan],
    config: &TableDetectorConfig,
) -> Vec<f32> {
    if candidates.is_empty() || data_rows.is_empty() {
        return candidates.to_vec();
    }

    let mut supported = vec![];
    for &boundary in candidates {
        let support = data_rows
            .iter()
            .filter(|row| {
                row.iter().any(|&idx| {
                    let el = &elements[idx];
                    (el.bbox.left() - boundary).abs() <= config.min_gap_width
                        || (el.bbox.right() - boundary).abs() <= config.min_gap_width
                })
            })
            .count();
        let fraction = support as f32 / data_rows.len() as f32;
        if fraction >= config.support_threshold {
            supported.push(boundary);
        }
    }

    if supported.len() < 3 {
        candidates.to_vec()
    } else {
        supported
    }
}

/// Assigns elements to columns by X, concatenates same-row fragments in
/// X order with a single space, and merges amount-less continuation rows
/// into the previous row's matching column.
fn extract_cells(
    elements: &[TextSpan],
    rows: &[Vec<usize>],
    boundaries: &[f32],
) -> (Vec<Vec<String>>, usize, usize) {
    let column_count = if boundaries.len() >= 2 { boundaries.len() - 1 } else { 1 };

    let column_of = |x: f32| -> usize {
        if boundaries.len() < 2 {
            return 0;
        }
        for (i, window) in boundaries.windows(2).enumerate() {
            if x >= window[0] && x < window[1] {
                return i;
            }
        }
        column_count - 1
    };

    let mut cell_rows: Vec<Vec<String>> = vec![];
    for row in rows {
        let mut cells = vec![String::new(); column_count];
        for &idx in row {
            let el = &elements[idx];
            let col = column_of(el.bbox.left());
            if cells[col].is_empty() {
                cells[col] = el.text.clone();
            } else {
                cells[col].push(' ');
                cells[col].push_str(&el.text);
            }
        }

        if let Some(prev) = cell_rows.last_mut() {
            if !row_has_amount_token(&cells) && row_has_amount_token(prev) {
                for (c, cell) in cells.iter().enumerate() {
                    if !cell.is_empty() {
                        if prev[c].is_empty() {
                            prev[c] = cell.clone();
                        } else {
                            prev[c].push(' ');
                            prev[c].push_str(cell);
                        }
                    }
                }
                continue;
            }
        }

        cell_rows.push(cells);
    }

    let row_count = cell_rows.len();
    (cell_rows, row_count, column_count)
}

/// An "amount-shaped" token: digits with optional thousands separators and
/// a decimal fraction, e.g. `1,234.56` or `-42.00`.
fn row_has_amount_token(cells: &[String]) -> bool {
    cells.iter().any(|c| c.split_whitespace().any(is_amount_shaped))
}

fn is_amount_shaped(token: &str) -> bool {
    let token = token.trim_start_matches(['-', '+', '$']);
    if token.is_empty() {
        return false;
    }
    let digits = token.chars().filter(|c| c.is_ascii_digit()).count();
    let other_valid = token
        .chars()
        .all(|c| c.is_ascii_digit() || c == ',' || c == '.');
    other_valid && digits >= 1 && token.contains('.')
}

/// Measure the fraction of data rows whose non-empty-cell count equals the
/// expected column count ±1.
fn classify(data_rows: &[Vec<String>], column_count: usize) -> (TableType, f32) {
    if data_rows.is_empty() {
        return (TableType::Irregular, 0.0);
    }

    let matching = data_rows
        .iter()
        .filter(|row| {
            let non_empty = row.iter().filter(|c| !c.is_empty()).count();
            non_empty.abs_diff(column_count) <= 1
        })
        .count();

    let consistency = matching as f32 / data_rows.len() as f32;
    let table_type = if consistency >= 0.9 {
        TableType::Regular
    } else {
        TableType::Irregular
    };
    (table_type, consistency)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, x: f32, y: f32) -> TextSpan {
        mock_span(text, x, y, 0)
    }

    #[test]
    fn test_ruling_line_classification() {
        let horizontal = RulingLine::new(0.0, 100.0, 200.0, 101.0);
        assert!(horizontal.is_horizontal());
        assert!(!horizontal.is_vertical());

        let vertical = RulingLine::new(50.0, 0.0, 51.0, 300.0);
        assert!(vertical.is_vertical());
        assert!(!vertical.is_horizontal());
    }

    #[test]
    fn test_detect_tables_empty_input() {
        let tables = detect_tables(&[], 0);
        assert!(tables.is_empty());
    }

    #[test]
    fn test_detect_tables_simple_grid() {
        let elements = vec![
            span("Name", 0.0, 100.0),
            span("Amount", 100.0, 100.0),
            span("Alice", 0.0, 80.0),
            span("12.50", 100.0, 80.0),
            span("Bob", 0.0, 60.0),
            span("30.00", 100.0, 60.0),
        ];

        let tables = detect_tables(&elements, 0);
        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert!(table.column_count >= 2);
        assert_eq!(table.page_index, 0);
    }

    #[test]
    fn test_detect_tables_insufficient_rows_returns_nothing() {
        let elements = vec![span("Solo", 0.0, 0.0)];
        let tables = detect_tables(&elements, 0);
        assert!(tables.is_empty());
    }

    #[test]
    fn test_multiline_header_scenario_seven_columns() {
        // Row counts [1,1,3,2,3,7,7,7,7,...]: a banner, a subtitle, a
        // three-part date line, a two-part address line, a three-part
        // account summary, then a uniform 7-column data grid.
        let mut elements = vec![
            span("STATEMENT", 0.0, 1000.0),
            span("Acme Bank", 0.0, 980.0),
            span("Jan", 0.0, 960.0),
            span("1", 50.0, 960.0),
            span("2026", 100.0, 960.0),
            span("123 Main St", 0.0, 940.0),
            span("Account 0001", 300.0, 940.0),
            span("Opening", 0.0, 920.0),
            span("Balance", 100.0, 920.0),
            span("100.00", 200.0, 920.0),
        ];

        let headers = ["Date", "Desc", "Ref", "Debit", "Credit", "Balance", "Type"];
        let header_y = 900.0;
        for (i, h) in headers.iter().enumerate() {
            elements.push(span(h, i as f32 * 80.0, header_y));
        }

        let data_rows = [
            ["01/02", "Coffee", "REF1", "4.50", "0.00", "95.50", "DR"],
            ["01/03", "Salary", "REF2", "0.00", "2000.00", "2095.50", "CR"],
            ["01/04", "Rent", "REF3", "900.00", "0.00", "1195.50", "DR"],
        ];
        for (r, row) in data_rows.iter().enumerate() {
            let y = header_y - 20.0 * (r as f32 + 1.0);
            for (c, cell) in row.iter().enumerate() {
                elements.push(span(cell, c as f32 * 80.0, y));
            }
        }

        let tables = detect_tables(&elements, 0);
        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert_eq!(table.column_count, 7);
        assert_eq!(table.table_type, TableType::Regular);
        assert!(table.consistency >= 0.9);
    }

    #[test]
    fn test_amount_shaped_token_detection() {
        assert!(is_amount_shaped("1,234.56"));
        assert!(is_amount_shaped("-42.00"));
        assert!(!is_amount_shaped("REF123"));
        assert!(!is_amount_shaped("Jan"));
    }

    #[test]
    fn test_classify_regular_table() {
        let rows = vec![
            vec!["a".into(), "b".into(), "c".into()],
            vec!["a".into(), "b".into(), "c".into()],
            vec!["a".into(), "b".into(), String::new()],
        ];
        let (table_type, consistency) = classify(&rows, 3);
        assert_eq!(table_type, TableType::Regular);
        assert!(consistency >= 0.9);
    }

    #[test]
    fn test_classify_irregular_table() {
        let rows = vec![
            vec!["a".into(), "b".into(), "c".into()],
            vec!["a".into(), String::new(), String::new()],
            vec![String::new(), String::new(), String::new()],
        ];
        let (table_type, _) = classify(&rows, 3);
        assert_eq!(table_type, TableType::Irregular);
    }

    #[test]
    fn test_detect_tables_idempotent_on_own_output() {
        let elements = vec![
            span("Name", 0.0, 100.0),
            span("Amount", 100.0, 100.0),
            span("Alice", 0.0, 80.0),
            span("12.50", 100.0, 80.0),
            span("Bob", 0.0, 60.0),
            span("30.00", 100.0, 60.0),
        ];

        let first = detect_tables(&elements, 0);
        assert_eq!(first.len(), 1);

        let reconstructed = first[0].to_text_elements();
        let second = detect_tables(&reconstructed, 0);
        assert_eq!(second.len(), 1);

        assert_eq!(first[0].rows, second[0].rows);
        assert_eq!(first[0].column_count, second[0].column_count);
        assert_eq!(first[0].row_count, second[0].row_count);
    }

    #[test]
    fn test_single_column_fallback_never_panics() {
        // Two rows, one element each, far apart: exercises the low-boundary
        // path without crashing regardless of what candidates emerge.
        let elements = vec![span("Only", 0.0, 100.0), span("Row", 0.0, 50.0)];
        let tables = detect_tables(&elements, 0);
        for table in &tables {
            assert!(table.column_count >= 1);
        }
    }
}
