//! Request validation: untyped JSON in, typed requests or field errors out.
//!
//! Every field is checked independently and all defects are reported
//! together, so a caller can fix a request in one round trip.

use chrono::Datelike;
use serde_json::{Map, Value};

use crate::{config::LibraryConfig, error::FieldError, models::Book};

/// Validated addBook request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddBook {
    pub isbn: String,
    pub title: String,
    pub authors: Vec<String>,
    pub pages: i32,
    pub year: i32,
    pub publisher: String,
    pub n_copies: i32,
}

impl From<AddBook> for Book {
    fn from(req: AddBook) -> Self {
        Book {
            isbn: req.isbn,
            title: req.title,
            authors: req.authors,
            pages: req.pages,
            year: req.year,
            publisher: req.publisher,
            n_copies: req.n_copies,
        }
    }
}

/// Validated findBooks request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindBooks {
    pub search: String,
    pub index: usize,
    pub count: usize,
}

/// Validated checkoutBook / returnBook request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LendRequest {
    pub isbn: String,
    pub patron_id: String,
}

/// Validated lendings listing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LendingsQuery {
    ByIsbn(String),
    ByPatron(String),
}

/// Limits applied to numeric book fields
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    pub earliest_year: Option<i32>,
    pub reject_future_years: bool,
    pub default_page_size: usize,
}

impl From<&LibraryConfig> for ValidationPolicy {
    fn from(config: &LibraryConfig) -> Self {
        Self {
            earliest_year: config.earliest_year,
            reject_future_years: config.reject_future_years,
            default_page_size: config.default_page_size,
        }
    }
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self::from(&LibraryConfig::default())
    }
}

type Validated<T> = Result<T, Vec<FieldError>>;

/// Collects per-field errors while extracting values from a JSON object
struct Fields<'a> {
    obj: &'a Map<String, Value>,
    errors: Vec<FieldError>,
}

impl<'a> Fields<'a> {
    fn of(req: &'a Value) -> Validated<Self> {
        match req.as_object() {
            Some(obj) => Ok(Self {
                obj,
                errors: Vec::new(),
            }),
            None => Err(vec![FieldError::global(
                crate::error::ErrorCode::BadType,
                "request must be an object",
            )]),
        }
    }

    /// Field value; JSON `null` counts as absent
    fn get(&self, name: &str) -> Option<&'a Value> {
        self.obj.get(name).filter(|v| !v.is_null())
    }

    fn required(&mut self, name: &str) -> Option<&'a Value> {
        let value = self.get(name);
        if value.is_none() {
            self.errors.push(FieldError::missing(name));
        }
        value
    }

    fn non_empty_string(&mut self, name: &str) -> Option<String> {
        let value = self.required(name)?;
        match value.as_str() {
            None => {
                self.errors.push(FieldError::bad_type(name, "string"));
                None
            }
            Some(s) if s.trim().is_empty() => {
                self.errors
                    .push(FieldError::bad_req(name, format!("{} must not be empty", name)));
                None
            }
            Some(s) => Some(s.to_string()),
        }
    }

    fn string_list(&mut self, name: &str) -> Option<Vec<String>> {
        let value = self.required(name)?;
        let Some(items) = value.as_array() else {
            self.errors.push(FieldError::bad_type(name, "string[]"));
            return None;
        };
        let strings: Option<Vec<&str>> = items.iter().map(Value::as_str).collect();
        let Some(strings) = strings else {
            self.errors.push(FieldError::bad_type(name, "string[]"));
            return None;
        };
        if strings.is_empty() {
            self.errors
                .push(FieldError::bad_req(name, format!("{} must not be empty", name)));
            return None;
        }
        if strings.iter().any(|s| s.trim().is_empty()) {
            self.errors.push(FieldError::bad_req(
                name,
                format!("{} must not contain an empty entry", name),
            ));
            return None;
        }
        Some(strings.into_iter().map(str::to_string).collect())
    }

    /// Integer with the given lower bound, `None` when the field is absent
    fn integer(&mut self, name: &str, min: i64) -> Option<Option<i64>> {
        let Some(value) = self.get(name) else {
            return Some(None);
        };
        let Value::Number(number) = value else {
            self.errors.push(FieldError::bad_type(name, "number"));
            return None;
        };
        let integer = number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                .map(|f| f as i64)
        });
        let qualifier = if min > 0 { "positive" } else { "non-negative" };
        match integer {
            Some(n) if n >= min && n <= i64::from(i32::MAX) => Some(Some(n)),
            _ => {
                self.errors.push(FieldError::bad_req(
                    name,
                    format!("{} must be a {} integer", name, qualifier),
                ));
                None
            }
        }
    }

    fn positive_int(&mut self, name: &str) -> Option<i32> {
        match self.integer(name, 1) {
            Some(Some(n)) => i32::try_from(n).ok(),
            Some(None) => {
                self.errors.push(FieldError::missing(name));
                None
            }
            None => None,
        }
    }

    fn finish<T>(self, value: Option<T>) -> Validated<T> {
        match value {
            Some(value) if self.errors.is_empty() => Ok(value),
            _ => Err(self.errors),
        }
    }
}

/// Validate an addBook request; `nCopies` defaults to 1
pub fn add_book(req: &Value, policy: &ValidationPolicy) -> Validated<AddBook> {
    let mut fields = Fields::of(req)?;

    let isbn = fields.non_empty_string("isbn");
    let title = fields.non_empty_string("title");
    let authors = fields.string_list("authors");
    let pages = fields.positive_int("pages");
    let year = fields.positive_int("year").and_then(|year| check_year(&mut fields, year, policy));
    let publisher = fields.non_empty_string("publisher");
    let n_copies = match fields.integer("nCopies", 1) {
        Some(n) => i32::try_from(n.unwrap_or(1)).ok(),
        None => None,
    };

    let book = (|| {
        Some(AddBook {
            isbn: isbn?,
            title: title?,
            authors: authors?,
            pages: pages?,
            year: year?,
            publisher: publisher?,
            n_copies: n_copies?,
        })
    })();
    fields.finish(book)
}

fn check_year(fields: &mut Fields<'_>, year: i32, policy: &ValidationPolicy) -> Option<i32> {
    let current = chrono::Utc::now().year();
    let too_old = policy.earliest_year.is_some_and(|earliest| year < earliest);
    let too_new = policy.reject_future_years && year > current;
    if too_old || too_new {
        let lower = policy.earliest_year.unwrap_or(1);
        let message = if policy.reject_future_years {
            format!("year must be in range [{}, {}]", lower, current)
        } else {
            format!("year must be at least {}", lower)
        };
        fields.errors.push(FieldError::bad_req("year", message));
        return None;
    }
    Some(year)
}

/// Validate a findBooks request. Tokenizing the search text is left to the
/// caller.
pub fn find_books(req: &Value, policy: &ValidationPolicy) -> Validated<FindBooks> {
    let mut fields = Fields::of(req)?;

    let search = fields.required("search").and_then(|value| match value.as_str() {
        Some(s) => Some(s.to_string()),
        None => {
            fields.errors.push(FieldError::bad_type("search", "string"));
            None
        }
    });
    let index = fields.integer("index", 0).map(|n| n.unwrap_or(0));
    let count = fields
        .integer("count", 0)
        .map(|n| n.unwrap_or(policy.default_page_size as i64));

    let find = (|| {
        Some(FindBooks {
            search: search?,
            index: usize::try_from(index?).ok()?,
            count: usize::try_from(count?).ok()?,
        })
    })();
    fields.finish(find)
}

/// Validate a checkoutBook or returnBook request
pub fn lend(req: &Value) -> Validated<LendRequest> {
    let mut fields = Fields::of(req)?;

    let patron_id = fields.non_empty_string("patronId");
    let isbn = fields.non_empty_string("isbn");

    let lend = (|| {
        Some(LendRequest {
            isbn: isbn?,
            patron_id: patron_id?,
        })
    })();
    fields.finish(lend)
}

/// Validate a lendings listing request: `findBy` names the key to search by
pub fn lendings(req: &Value) -> Validated<LendingsQuery> {
    let mut fields = Fields::of(req)?;

    let query = match fields.non_empty_string("findBy").as_deref() {
        Some("isbn") => fields.non_empty_string("isbn").map(LendingsQuery::ByIsbn),
        Some("patronId") => fields
            .non_empty_string("patronId")
            .map(LendingsQuery::ByPatron),
        Some(other) => {
            fields.errors.push(FieldError::bad_req(
                "findBy",
                format!("findBy must be isbn or patronId, not {}", other),
            ));
            None
        }
        None => None,
    };
    fields.finish(query)
}
