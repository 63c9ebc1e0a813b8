use sql_repository::prelude::*;

#[derive(Clone, Debug, Default, PartialEq)]
struct Task {
    id: Option<i64>,
    name: String,
    done: bool,
}

impl Record for Task {
    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn to_columns(&self) -> ColumnValues {
        vec![
            ("name".into(), self.name.as_str().into()),
            ("done".into(), self.done.into()),
        ]
    }

    fn from_row(row: &Row) -> Result<Self, RepositoryError> {
        Ok(Self {
            id: require_column(row, "id")?.as_int().copied(),
            name: require_column(row, "name")?
                .as_text()
                .map(ToOwned::to_owned)
                .unwrap_or_default(),
            done: require_column(row, "done")?.as_bool().unwrap_or(false),
        })
    }

    fn set_column(&mut self, column: &str, value: &FieldValue) -> Result<(), RepositoryError> {
        match column {
            "name" => self.name = value.as_text().map(ToOwned::to_owned).unwrap_or_default(),
            "done" => self.done = value.as_bool().unwrap_or(false),
            other => {
                return Err(RepositoryError::DeserializeError(format!(
                    "unknown column {other}"
                )));
            }
        }
        Ok(())
    }
}

fn task(name: &str) -> Task {
    Task {
        name: name.into(),
        ..Task::default()
    }
}

#[test]
fn fake_inserts_assign_sequential_ids() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let repo: FakeRepo<Task> = FakeRepo::new();
        let mut a = task("first");
        let mut b = task("second");

        repo.insert(&mut a).await?;
        repo.insert(&mut b).await?;
        assert_eq!(a.id, Some(1));
        assert_eq!(b.id, Some(2));

        assert_eq!(repo.get_by_id(2).await?, Some(b.clone()));
        assert_eq!(repo.get_all(&[], &[]).await?, vec![a.clone(), b.clone()]);
        assert_eq!(repo.get_all_ids(&[], &[]).await?, vec![1, 2]);
        assert_eq!(repo.first(&[], &[]).await?, Some(a));

        Ok(())
    })
}

#[test]
fn fake_updates_replace_stored_records() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let repo: FakeRepo<Task> = FakeRepo::new();
        let mut stored = task("draft");
        repo.insert(&mut stored).await?;

        stored.name = "final".into();
        repo.update(&stored).await?;
        assert_eq!(
            repo.get_by_id(1).await?.map(|t| t.name),
            Some("final".to_string())
        );

        repo.update_partial(&mut stored, vec![("done".into(), true.into())])
            .await?;
        assert!(stored.done);
        assert_eq!(repo.get_by_id(1).await?.map(|t| t.done), Some(true));

        Ok(())
    })
}

#[test]
fn fake_update_or_insert_matches_on_field() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let repo: FakeRepo<Task> = FakeRepo::new();
        let mut seed = task("alpha");
        repo.insert(&mut seed).await?;

        // Same name: must reuse the stored identifier.
        let mut replacement = Task {
            name: "alpha".into(),
            done: true,
            ..Task::default()
        };
        repo.update_or_insert_first_by_field(&mut replacement, "name")
            .await?;
        assert_eq!(replacement.id, Some(1));
        assert_eq!(repo.get_all(&[], &[]).await?.len(), 1);

        // New name: inserted fresh.
        let mut novel = task("beta");
        repo.update_or_insert_first_by_field(&mut novel, "name").await?;
        assert_eq!(novel.id, Some(2));
        assert_eq!(repo.get_all(&[], &[]).await?.len(), 2);

        Ok(())
    })
}

#[test]
fn fake_deletes_by_identifier() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let repo = FakeRepo::with_records(vec![task("a"), task("b"), task("c")]);

        assert_eq!(repo.delete_by_id(2).await?, 1);
        assert_eq!(repo.delete_by_ids(&[1, 3, 99]).await?, 2);
        assert!(repo.get_all(&[], &[]).await?.is_empty());

        Ok(())
    })
}

#[test]
fn fake_rejects_filter_dependent_operations() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let repo: FakeRepo<Task> = FakeRepo::new();

        assert!(matches!(
            repo.exists(&[column("done").eq(true)]).await,
            Err(RepositoryError::Unimplemented(_))
        ));
        assert!(matches!(
            repo.delete(&[match_all()]).await,
            Err(RepositoryError::Unimplemented(_))
        ));
        assert!(matches!(
            repo.get_or_create(&[], Task::default()).await,
            Err(RepositoryError::Unimplemented(_))
        ));

        Ok(())
    })
}
