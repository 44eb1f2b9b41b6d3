//! Bulk-insert statement templates
//!
//! A template is built once per table family at setup. It holds the column
//! clause and the `VALUES` clause for a full batch, so a capacity-triggered
//! flush only has to prepend `INSERT INTO <table>`. Partially filled batches
//! (periodic or manual flushes) get an exact-size `VALUES` clause on demand.

use std::fmt::Write;

use crate::config::Driver;

use super::error::{StorageError, StorageResult};
use super::schema::{Category, Family};

/// Bind parameter syntax of a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?`
    QuestionMark,
    /// `$1`, `$2`, ... numbered across the whole statement
    Numbered,
}

impl From<Driver> for PlaceholderStyle {
    fn from(driver: Driver) -> Self {
        match driver {
            Driver::Mysql => PlaceholderStyle::QuestionMark,
            Driver::Postgres => PlaceholderStyle::Numbered,
        }
    }
}

/// Immutable insert template for one table family
#[derive(Debug, Clone)]
pub struct QueryTemplate {
    family: Family,
    capacity: usize,
    style: PlaceholderStyle,
    columns: String,
    full_values: String,
}

impl QueryTemplate {
    /// Build the template for `capacity` rows
    ///
    /// Fails if the batch would exceed the driver's bind parameter limit.
    pub fn build(family: Family, capacity: usize, driver: Driver) -> StorageResult<Self> {
        if capacity == 0 {
            return Err(StorageError::InvalidConfig(
                "bulk size must be at least 1".to_string(),
            ));
        }

        let parameters = capacity * family.width();
        let limit = driver.max_bind_parameters();
        if parameters > limit {
            return Err(StorageError::InvalidConfig(format!(
                "bulk size {capacity} needs {parameters} bind parameters per statement, \
                 {driver:?} allows {limit}"
            )));
        }

        let style = PlaceholderStyle::from(driver);
        let columns = format!("({})", family.columns().join(", "));
        let full_values = values_clause(family.width(), capacity, style);

        Ok(Self {
            family,
            capacity,
            style,
            columns,
            full_values,
        })
    }

    pub fn family(&self) -> Family {
        self.family
    }

    /// Rows per full batch
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Render `INSERT INTO <table> (...) VALUES ...` for `rows` rows
    pub fn render(&self, table: &str, rows: usize) -> String {
        if rows == self.capacity {
            format!("INSERT INTO {table} {} VALUES {}", self.columns, self.full_values)
        } else {
            let values = values_clause(self.family.width(), rows, self.style);
            format!("INSERT INTO {table} {} VALUES {values}", self.columns)
        }
    }
}

/// `(?,?,..),(?,?,..)` with `rows` groups of `width` placeholders
fn values_clause(width: usize, rows: usize, style: PlaceholderStyle) -> String {
    let mut clause = String::with_capacity(rows * (width * 4 + 3));
    let mut index = 1;

    for row in 0..rows {
        if row > 0 {
            clause.push(',');
        }
        clause.push('(');
        for column in 0..width {
            if column > 0 {
                clause.push(',');
            }
            match style {
                PlaceholderStyle::QuestionMark => clause.push('?'),
                PlaceholderStyle::Numbered => {
                    let _ = write!(clause, "${index}");
                }
            }
            index += 1;
        }
        clause.push(')');
    }

    clause
}

/// The SIP and RTC templates for one sink
#[derive(Debug, Clone)]
pub struct QueryTemplates {
    sip: QueryTemplate,
    rtc: QueryTemplate,
}

impl QueryTemplates {
    pub fn build(driver: Driver, sip_capacity: usize, rtc_capacity: usize) -> StorageResult<Self> {
        Ok(Self {
            sip: QueryTemplate::build(Family::Sip, sip_capacity, driver)?,
            rtc: QueryTemplate::build(Family::Rtc, rtc_capacity, driver)?,
        })
    }

    pub fn for_family(&self, family: Family) -> &QueryTemplate {
        match family {
            Family::Sip => &self.sip,
            Family::Rtc => &self.rtc,
        }
    }

    pub fn for_category(&self, category: Category) -> &QueryTemplate {
        self.for_family(category.family())
    }
}
