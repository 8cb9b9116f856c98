// src/services/lots.rs
//
// Lot (sklop) bookkeeping on the flat session map. Lot `i` owns the
// `lot_i.*` namespace plus `lotConfiguration.lots.i.*`.

use serde_json::Value;

use crate::{
    common::error::AppError,
    models::{
        schema::FormSchema,
        session::{join_key, FormScope, SessionFieldMap},
    },
    services::visibility::{HAS_LOTS_KEY, LOTS_KEY},
};

pub fn lot_count(session: &SessionFieldMap) -> usize {
    session.array_len(LOTS_KEY)
}

pub fn lot_name(session: &SessionFieldMap, index: usize) -> Option<String> {
    session
        .get(&lot_name_key(index))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn lot_name_key(index: usize) -> String {
    join_key(&join_key(LOTS_KEY, &index.to_string()), "name")
}

fn lot_config_key(index: usize) -> String {
    join_key(LOTS_KEY, &index.to_string())
}

fn ensure_lot(session: &SessionFieldMap, index: usize) -> Result<(), AppError> {
    if index < lot_count(session) {
        Ok(())
    } else {
        Err(AppError::LotNotFound(index))
    }
}

/// Appends a lot and switches lots on. Returns the new lot's index.
pub fn add_lot(session: &mut SessionFieldMap, name: &str) -> usize {
    let index = lot_count(session);
    session.insert(HAS_LOTS_KEY, Value::Bool(true));
    session.insert(lot_name_key(index), Value::String(name.trim().to_string()));
    tracing::debug!("Lot {} added: {}", index, name);
    index
}

pub fn rename_lot(session: &mut SessionFieldMap, index: usize, name: &str) -> Result<(), AppError> {
    ensure_lot(session, index)?;
    session.insert(lot_name_key(index), Value::String(name.trim().to_string()));
    Ok(())
}

/// Removes lot `index` and shifts every later lot down by one, so lot
/// namespaces stay dense and never share keys.
pub fn remove_lot(session: &mut SessionFieldMap, index: usize) -> Result<(), AppError> {
    ensure_lot(session, index)?;
    let count = lot_count(session);

    session.remove_under(&lot_config_key(index));
    remove_scope(session, FormScope::Lot(index));

    for later in index + 1..count {
        session.rename_prefix(&lot_config_key(later), &lot_config_key(later - 1));
        rename_scope(session, FormScope::Lot(later), FormScope::Lot(later - 1));
    }

    if lot_count(session) == 0 {
        session.insert(HAS_LOTS_KEY, Value::Bool(false));
    }
    tracing::debug!("Lot {} removed, {} remaining", index, count - 1);
    Ok(())
}

/// Copies every lot-scoped value of the general scope into lot `index`,
/// overwriting what the lot already had on the same keys.
pub fn copy_general_to_lot(
    schema: &FormSchema,
    session: &mut SessionFieldMap,
    index: usize,
) -> Result<usize, AppError> {
    ensure_lot(session, index)?;
    let target = FormScope::Lot(index);

    let mut copied = 0;
    for section in schema.sections.iter().filter(|s| s.lot_scoped) {
        let source_prefix = section.key_prefix(FormScope::General);
        let target_prefix = section.key_prefix(target);
        for key in session.keys_under(&source_prefix) {
            if let Some(value) = session.get(&key).cloned() {
                let new_key = format!("{}{}", target_prefix, &key[source_prefix.len()..]);
                session.insert(new_key, value);
                copied += 1;
            }
        }
    }
    tracing::debug!("Copied {} general value(s) into lot {}", copied, index);
    Ok(copied)
}

fn scope_prefix(scope: FormScope) -> String {
    scope.prefix().unwrap_or_default()
}

fn remove_scope(session: &mut SessionFieldMap, scope: FormScope) {
    session.remove_under(&scope_prefix(scope));
}

fn rename_scope(session: &mut SessionFieldMap, from: FormScope, to: FormScope) {
    session.rename_prefix(&scope_prefix(from), &scope_prefix(to));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schema::tests::bundled_schema;
    use serde_json::json;

    fn three_lots() -> SessionFieldMap {
        let mut session = SessionFieldMap::new();
        for (i, name) in ["Prenosniki", "Monitorji", "Tiskalniki"].iter().enumerate() {
            add_lot(&mut session, name);
            session.insert(format!("lot_{}.orderType.estimatedValue", i), json!((i + 1) * 1000));
            session.insert(
                format!("lot_{}.orderType.cofinancers.0.cofinancerName", i),
                json!(format!("Sofinancer {}", i)),
            );
        }
        session
    }

    #[test]
    fn add_lot_enables_lots_and_names_them() {
        let session = three_lots();
        assert_eq!(lot_count(&session), 3);
        assert_eq!(session.get(HAS_LOTS_KEY), Some(&json!(true)));
        assert_eq!(lot_name(&session, 1).as_deref(), Some("Monitorji"));
    }

    #[test]
    fn removing_a_lot_shifts_later_lots_down() {
        let mut session = three_lots();
        remove_lot(&mut session, 0).unwrap();

        assert_eq!(lot_count(&session), 2);
        assert_eq!(lot_name(&session, 0).as_deref(), Some("Monitorji"));
        assert_eq!(lot_name(&session, 1).as_deref(), Some("Tiskalniki"));
        assert_eq!(session.get("lot_0.orderType.estimatedValue"), Some(&json!(2000)));
        assert_eq!(
            session.get("lot_1.orderType.cofinancers.0.cofinancerName"),
            Some(&json!("Sofinancer 2"))
        );
        assert!(session.keys_under("lot_2").is_empty());
    }

    #[test]
    fn removing_the_last_lot_turns_lots_off() {
        let mut session = SessionFieldMap::new();
        add_lot(&mut session, "Edini");
        session.insert("lot_0.priceInfo.priceClause", json!("drugo"));

        remove_lot(&mut session, 0).unwrap();

        assert_eq!(session.get(HAS_LOTS_KEY), Some(&json!(false)));
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn unknown_lot_is_an_error() {
        let mut session = three_lots();
        assert!(matches!(remove_lot(&mut session, 3), Err(AppError::LotNotFound(3))));
        assert!(matches!(rename_lot(&mut session, 7, "x"), Err(AppError::LotNotFound(7))));
    }

    #[test]
    fn copy_general_only_touches_the_target_lot() {
        let schema = bundled_schema();
        let mut session = three_lots();
        session.insert("general.priceInfo.priceClause", json!("fiksne cene"));
        session.insert("general.orderType.type", json!("blago"));
        session.insert("clientInfo.singleClientName", json!("Občina Bled"));

        let copied = copy_general_to_lot(&schema, &mut session, 1).unwrap();

        assert_eq!(copied, 2);
        assert_eq!(session.get("lot_1.priceInfo.priceClause"), Some(&json!("fiksne cene")));
        assert_eq!(session.get("lot_1.orderType.type"), Some(&json!("blago")));
        assert!(session.get("lot_0.priceInfo.priceClause").is_none());
        assert!(session.get("lot_2.orderType.type").is_none());
    }
}
