//! Insertion pipeline: ignore-default trimming, RETURNING backfill, and the
//! bulk consistency pre-flight.

use crate::error::RepositoryError;
use crate::queries::{InsertManyQuery, InsertQuery};
use crate::record::Record;
use crate::results::Row;
use crate::table::TableSpec;
use crate::types::{ColumnValues, FieldValue, column_value};

use super::Repository;

/// One record's trimmed payload plus the ignore-default columns that were
/// left out of it and must be read back from the store.
struct InsertPlan {
    payload: ColumnValues,
    deferred: Vec<String>,
}

fn plan_insert<R: Record>(repo: &Repository<R>, record: &R, defaults: &ColumnValues) -> InsertPlan {
    let serialized = repo.serialize(record);
    let deferred: Vec<String> = repo
        .ignore_default
        .iter()
        .filter(|name| {
            match (column_value(&serialized, name), column_value(defaults, name)) {
                (Some(actual), Some(default)) => actual == default,
                _ => false,
            }
        })
        .map(|name| (*name).to_string())
        .collect();

    let payload = serialized
        .into_iter()
        .filter(|(column, _)| !deferred.iter().any(|d| d == column))
        .collect();

    InsertPlan { payload, deferred }
}

fn returning_list(id_column: &str, deferred: &[String]) -> Vec<String> {
    let mut returning = Vec::with_capacity(1 + deferred.len());
    returning.push(id_column.to_string());
    for column in deferred {
        if !returning.contains(column) {
            returning.push(column.clone());
        }
    }
    returning
}

fn apply_returned<R: Record>(
    repo: &Repository<R>,
    record: &mut R,
    deferred: &[String],
    row: &Row,
) -> Result<(), RepositoryError> {
    let id = row
        .get(repo.table.id_column)
        .and_then(|value| value.as_int().copied())
        .ok_or_else(|| {
            RepositoryError::ExecutionError("insert did not return an identifier".to_string())
        })?;
    record.set_id(id);

    for column in deferred {
        let value = row.get(column).ok_or_else(|| {
            RepositoryError::ExecutionError(format!("returning row is missing column {column}"))
        })?;
        record.set_column(column, value)?;
    }
    Ok(())
}

pub(super) async fn insert<R: Record>(
    repo: &Repository<R>,
    record: &mut R,
) -> Result<(), RepositoryError> {
    let defaults = repo.serialize(&R::default());
    let plan = plan_insert(repo, record, &defaults);
    let returning = returning_list(repo.table.id_column, &plan.deferred);

    let query = InsertQuery::new(repo.table, &plan.payload, &returning).build()?;
    let row = repo
        .executor()?
        .insert_returning_one(&query, &repo.options)
        .await?;
    apply_returned(repo, record, &plan.deferred, &row)
}

pub(super) async fn insert_many<R: Record>(
    repo: &Repository<R>,
    records: &mut [R],
) -> Result<(), RepositoryError> {
    if records.is_empty() {
        return Ok(());
    }

    let defaults = repo.serialize(&R::default());
    let plans: Vec<InsertPlan> = records
        .iter()
        .map(|record| plan_insert(repo, record, &defaults))
        .collect();
    check_server_default_consistency(repo, &plans)?;

    // A multi-row statement has one column list, so a column can only be
    // omitted when every record defers it. Columns deferred by some records
    // but not all carry their declared default explicitly; the pre-flight
    // above already rejected the case where that would desynchronize a
    // sequence.
    let omitted: Vec<&str> = repo
        .ignore_default
        .iter()
        .copied()
        .filter(|name| plans.iter().all(|plan| plan.deferred.iter().any(|d| d == name)))
        .collect();
    let columns = bulk_columns(repo.table, &defaults, &omitted);
    let rows: Vec<Vec<FieldValue>> = records
        .iter()
        .map(|record| {
            let serialized = repo.serialize(record);
            columns
                .iter()
                .map(|column| {
                    column_value(&serialized, column)
                        .cloned()
                        .unwrap_or(FieldValue::Null)
                })
                .collect()
        })
        .collect();

    let mut returning = vec![repo.table.id_column.to_string()];
    for plan in &plans {
        for column in &plan.deferred {
            if !returning.contains(column) {
                returning.push(column.clone());
            }
        }
    }

    let query = InsertManyQuery::new(repo.table, &columns, &rows, &returning).build()?;
    let returned = repo
        .executor()?
        .insert_returning_many(&query, &repo.options)
        .await?;

    // Returned rows are positional; zip stops at the shorter side if the
    // backend returns fewer rows than records.
    for ((record, plan), row) in records.iter_mut().zip(&plans).zip(&returned) {
        apply_returned(repo, record, &plan.deferred, row)?;
    }
    Ok(())
}

/// Column list for the combined statement: the table's data columns, in
/// declaration order, that the record type serializes and the batch does not
/// uniformly defer.
fn bulk_columns(table: &TableSpec, defaults: &ColumnValues, omitted: &[&str]) -> Vec<String> {
    table
        .data_columns()
        .filter(|&column| column_value(defaults, column).is_some())
        .filter(|&column| !omitted.contains(&column))
        .map(ToOwned::to_owned)
        .collect()
}

/// Reject batches that mix default and explicit values for a column backed
/// by a server-side sequence. Omitting the column for some rows while
/// sending explicit values for others would advance the sequence out of step
/// with the stored values.
fn check_server_default_consistency<R: Record>(
    repo: &Repository<R>,
    plans: &[InsertPlan],
) -> Result<(), RepositoryError> {
    for column in repo
        .ignore_default
        .iter()
        .filter(|name| repo.table.has_server_default(name))
    {
        let deferred_first = plans[0].deferred.iter().any(|d| d == column);
        let mixed = plans
            .iter()
            .any(|plan| plan.deferred.iter().any(|d| d == column) != deferred_first);
        if mixed {
            return Err(RepositoryError::InconsistentDefaultsError(
                (*column).to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::record::require_column;
    use crate::table::TableSpec;

    use super::*;

    static TICKETS: TableSpec = TableSpec {
        name: "tickets",
        columns: &["id", "title", "priority", "position"],
        id_column: "id",
        server_default_columns: &["position"],
    };

    #[derive(Clone, Debug, PartialEq)]
    struct Ticket {
        id: Option<i64>,
        title: String,
        priority: i64,
        position: i64,
    }

    impl Default for Ticket {
        fn default() -> Self {
            Self {
                id: None,
                title: String::new(),
                priority: 5,
                position: 0,
            }
        }
    }

    impl Record for Ticket {
        fn id(&self) -> Option<i64> {
            self.id
        }

        fn set_id(&mut self, id: i64) {
            self.id = Some(id);
        }

        fn to_columns(&self) -> ColumnValues {
            vec![
                ("title".into(), self.title.as_str().into()),
                ("priority".into(), self.priority.into()),
                ("position".into(), self.position.into()),
            ]
        }

        fn from_row(row: &Row) -> Result<Self, RepositoryError> {
            Ok(Self {
                id: require_column(row, "id")?.as_int().copied(),
                title: require_column(row, "title")?
                    .as_text()
                    .map(ToOwned::to_owned)
                    .unwrap_or_default(),
                priority: require_column(row, "priority")?.as_int().copied().unwrap_or(0),
                position: require_column(row, "position")?.as_int().copied().unwrap_or(0),
            })
        }

        fn set_column(&mut self, column: &str, value: &FieldValue) -> Result<(), RepositoryError> {
            match column {
                "title" => {
                    self.title = value.as_text().map(ToOwned::to_owned).unwrap_or_default();
                }
                "priority" => self.priority = value.as_int().copied().unwrap_or(0),
                "position" => self.position = value.as_int().copied().unwrap_or(0),
                other => {
                    return Err(RepositoryError::DeserializeError(format!(
                        "unknown column {other}"
                    )));
                }
            }
            Ok(())
        }
    }

    fn repo() -> Repository<Ticket> {
        Repository::from_context(&TICKETS).ignore_default(&["priority", "position"])
    }

    #[test]
    fn default_valued_ignore_columns_are_deferred() {
        let repo = repo();
        let defaults = repo.serialize(&Ticket::default());
        let record = Ticket {
            title: "a".into(),
            ..Ticket::default()
        };

        let plan = plan_insert(&repo, &record, &defaults);
        assert_eq!(plan.deferred, vec!["priority", "position"]);
        assert_eq!(plan.payload, vec![("title".into(), FieldValue::Text("a".into()))]);
    }

    #[test]
    fn explicit_values_stay_in_the_payload() {
        let repo = repo();
        let defaults = repo.serialize(&Ticket::default());
        let record = Ticket {
            title: "a".into(),
            priority: 9,
            position: 3,
            ..Ticket::default()
        };

        let plan = plan_insert(&repo, &record, &defaults);
        assert!(plan.deferred.is_empty());
        assert_eq!(plan.payload.len(), 3);
    }

    #[test]
    fn fully_deferred_record_builds_a_default_values_insert() {
        let repo: Repository<Ticket> = Repository::from_context(&TICKETS)
            .ignore_default(&["title", "priority", "position"]);
        let defaults = repo.serialize(&Ticket::default());

        let plan = plan_insert(&repo, &Ticket::default(), &defaults);
        assert!(plan.payload.is_empty());

        let returning = returning_list(TICKETS.id_column, &plan.deferred);
        let built = InsertQuery::new(&TICKETS, &plan.payload, &returning)
            .build()
            .unwrap();
        assert_eq!(
            built.sql,
            r#"INSERT INTO "tickets" VALUES (DEFAULT) RETURNING "id", "title", "priority", "position""#
        );
        assert!(built.params.is_empty());
    }

    #[test]
    fn bulk_column_list_follows_table_order_minus_omitted() {
        let repo = repo();
        let defaults = repo.serialize(&Ticket::default());

        assert_eq!(
            bulk_columns(&TICKETS, &defaults, &[]),
            vec!["title", "priority", "position"]
        );
        assert_eq!(
            bulk_columns(&TICKETS, &defaults, &["position"]),
            vec!["title", "priority"]
        );
        assert!(bulk_columns(&TICKETS, &defaults, &["title", "priority", "position"]).is_empty());
    }

    #[test]
    fn returning_always_leads_with_the_identifier() {
        let deferred = vec!["position".to_string()];
        assert_eq!(returning_list("id", &deferred), vec!["id", "position"]);
        assert_eq!(returning_list("id", &[]), vec!["id"]);
    }

    #[test]
    fn mixed_server_default_batch_is_rejected() {
        let repo = repo();
        let defaults = repo.serialize(&Ticket::default());
        let deferred = Ticket {
            title: "a".into(),
            ..Ticket::default()
        };
        let explicit = Ticket {
            title: "b".into(),
            position: 7,
            ..Ticket::default()
        };

        let plans = vec![
            plan_insert(&repo, &deferred, &defaults),
            plan_insert(&repo, &explicit, &defaults),
        ];
        let err = check_server_default_consistency(&repo, &plans).unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::InconsistentDefaultsError(column) if column == "position"
        ));
    }

    #[test]
    fn mixed_client_default_batch_is_allowed() {
        // priority has a declared default but no server-side sequence, so a
        // mixed batch just sends the declared default explicitly.
        let repo = repo();
        let defaults = repo.serialize(&Ticket::default());
        let plans = vec![
            plan_insert(
                &repo,
                &Ticket {
                    title: "a".into(),
                    ..Ticket::default()
                },
                &defaults,
            ),
            plan_insert(
                &repo,
                &Ticket {
                    title: "b".into(),
                    priority: 1,
                    ..Ticket::default()
                },
                &defaults,
            ),
        ];
        assert!(check_server_default_consistency(&repo, &plans).is_ok());
    }

    #[test]
    fn backfill_assigns_id_and_deferred_columns() {
        let repo = repo();
        let mut record = Ticket {
            title: "a".into(),
            ..Ticket::default()
        };
        let row = Row::new(
            std::sync::Arc::new(vec!["id".into(), "priority".into(), "position".into()]),
            vec![FieldValue::Int(42), FieldValue::Int(5), FieldValue::Int(11)],
        );

        apply_returned(
            &repo,
            &mut record,
            &["priority".to_string(), "position".to_string()],
            &row,
        )
        .unwrap();
        assert_eq!(record.id, Some(42));
        assert_eq!(record.position, 11);
    }
}
