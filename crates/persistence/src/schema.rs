//! Database schema definitions
//!
//! Tables are declared through a small typed builder instead of raw SQL
//! string constants: each column carries a closed [`ColumnKind`] plus
//! nullability/uniqueness/key flags, and a single function renders the
//! CREATE TABLE statement.

/// Name of the historical bar + indicator table
pub const HISTORICAL_TABLE: &str = "historical_rows";

/// Name of the append-only result log
pub const RESULT_LOG_TABLE: &str = "result_log";

/// SQLite storage class for a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
}

impl ColumnKind {
    fn sql(self) -> &'static str {
        match self {
            ColumnKind::Integer => "INTEGER",
            ColumnKind::Float => "REAL",
            ColumnKind::Text => "TEXT",
        }
    }
}

/// A single column definition
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub unique: bool,
    pub primary_key: bool,
}

impl ColumnSpec {
    pub fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
            unique: false,
            primary_key: false,
        }
    }

    pub fn integer(name: &'static str) -> Self {
        Self::new(name, ColumnKind::Integer)
    }

    pub fn float(name: &'static str) -> Self {
        Self::new(name, ColumnKind::Float)
    }

    pub fn text(name: &'static str) -> Self {
        Self::new(name, ColumnKind::Text)
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Render the column clause for a CREATE TABLE statement
    fn definition(&self) -> String {
        let mut def = format!("{} {}", self.name, self.kind.sql());
        if self.primary_key {
            def.push_str(" PRIMARY KEY AUTOINCREMENT");
        } else {
            if !self.nullable {
                def.push_str(" NOT NULL");
            }
            if self.unique {
                def.push_str(" UNIQUE");
            }
        }
        def
    }
}

/// A full table definition: columns plus an optional composite UNIQUE key
#[derive(Debug, Clone)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: Vec<ColumnSpec>,
    pub unique_together: Vec<&'static str>,
}

impl TableSpec {
    pub fn new(name: &'static str, columns: Vec<ColumnSpec>) -> Self {
        Self {
            name,
            columns,
            unique_together: Vec::new(),
        }
    }

    pub fn unique_together(mut self, columns: Vec<&'static str>) -> Self {
        self.unique_together = columns;
        self
    }

    /// Render the CREATE TABLE IF NOT EXISTS statement
    pub fn create_statement(&self) -> String {
        let mut clauses: Vec<String> = self.columns.iter().map(ColumnSpec::definition).collect();
        if !self.unique_together.is_empty() {
            clauses.push(format!("UNIQUE({})", self.unique_together.join(", ")));
        }
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.name,
            clauses.join(", ")
        )
    }
}

/// Historical bar + indicator table, keyed by UNIQUE(ticker, date).
///
/// Raw OHLCV plus every derived indicator column; a row is only ever
/// written once its full indicator set is defined.
pub fn historical_rows_table() -> TableSpec {
    let mut columns = vec![
        ColumnSpec::integer("id").primary_key(),
        ColumnSpec::text("ticker"),
        ColumnSpec::text("date"),
        ColumnSpec::float("open"),
        ColumnSpec::float("high"),
        ColumnSpec::float("low"),
        ColumnSpec::float("close"),
        ColumnSpec::float("adj_close"),
        ColumnSpec::integer("volume"),
    ];
    for indicator in [
        "ma20",
        "ma50",
        "ma100",
        "rsi",
        "macd_histogram",
        "bb_lower",
        "bb_middle",
        "bb_upper",
        "stoch_k",
        "stoch_d",
        "volume_change",
        "change",
        "tenkan_sen",
        "kijun_sen",
        "senkou_span_a",
        "senkou_span_b",
    ] {
        columns.push(ColumnSpec::float(indicator));
    }
    TableSpec::new(HISTORICAL_TABLE, columns).unique_together(vec!["ticker", "date"])
}

/// Append-only result log: one row per computed market-status payload.
pub fn result_log_table() -> TableSpec {
    TableSpec::new(
        RESULT_LOG_TABLE,
        vec![
            ColumnSpec::integer("id").primary_key(),
            ColumnSpec::text("created_at"),
            ColumnSpec::text("payload"),
        ],
    )
}

/// All statements to run at startup, in order
pub fn create_statements() -> Vec<String> {
    vec![
        historical_rows_table().create_statement(),
        result_log_table().create_statement(),
        format!("CREATE INDEX IF NOT EXISTS idx_history_ticker ON {HISTORICAL_TABLE}(ticker)"),
        format!("CREATE INDEX IF NOT EXISTS idx_history_date ON {HISTORICAL_TABLE}(date)"),
    ]
}
