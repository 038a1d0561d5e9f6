use crate::api::{bad_request, store_failure, today};
use crate::auth::auth::AuthUser;
use crate::model::employee::Employee;
use crate::store::Stores;
use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{info, warn};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 10)]
    pub total: usize,
}

/// Register Employee
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = Employee,
    responses(
        (status = 200, description = "Employee registered successfully", body = Object, example = json!({
            "message": "Employee registered successfully"
        })),
        (status = 400, description = "Missing matricule"),
        (status = 409, description = "Matricule already exists", body = Object, example = json!({
            "message": "Matricule already exists"
        })),
        (status = 500, description = "Internal server error", body = Object, example = json!({
            "message": "Something went wrong, Contact with system admin"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_employee(
    auth: AuthUser,
    stores: web::Data<Stores>,
    payload: web::Json<Employee>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let mut employee = payload.into_inner();
    employee.matricule = employee.matricule.trim().to_string();
    if employee.matricule.is_empty() {
        return Err(bad_request("Matricule is required"));
    }
    employee.prepare_new(today());

    let inserted = stores
        .employees
        .insert(employee.clone())
        .await
        .map_err(|e| store_failure(e, "register employee"))?;

    if !inserted {
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "Matricule already exists"
        })));
    }

    info!(matricule = %employee.matricule, by = %auth.username, "Employee registered");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee registered successfully",
        "employee": employee
    })))
}

/// List Employees
#[utoipa::path(
    get,
    path = "/api/employees",
    responses(
        (status = 200, description = "Employees in registry order", body = EmployeeListResponse)
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    _auth: AuthUser,
    stores: web::Data<Stores>,
) -> actix_web::Result<impl Responder> {
    let employees = stores
        .employees
        .list()
        .await
        .map_err(|e| store_failure(e, "list employees"))?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        total: employees.len(),
        data: employees,
    }))
}

/// Get Employee by matricule
#[utoipa::path(
    get,
    path = "/api/employees/{matricule}",
    params(
        ("matricule", Path, description = "Employee matricule")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 403, description = "Employees can only read their own record"),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_employee(
    auth: AuthUser,
    stores: web::Data<Stores>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let matricule = path.into_inner();
    auth.require_self_or_hr(&matricule)?;

    let employee = stores
        .employees
        .get(&matricule)
        .await
        .map_err(|e| store_failure(e, "fetch employee"))?;

    match employee {
        Some(emp) => Ok(HttpResponse::Ok().json(emp)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        }))),
    }
}

/// Update Employee
///
/// The body is merged field by field over the stored record.
#[utoipa::path(
    put,
    path = "/api/employees/{matricule}",
    params(
        ("matricule", Path, description = "Employee matricule")
    ),
    request_body = Object,
    responses(
        (status = 200, description = "Employee updated successfully", body = Object, example = json!({
            "message": "Employee updated successfully"
        })),
        (status = 400, description = "Body is not an object or a field has the wrong type"),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_employee(
    auth: AuthUser,
    stores: web::Data<Stores>,
    path: web::Path<String>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let matricule = path.into_inner();

    let patch: Map<String, Value> = match body.into_inner() {
        Value::Object(map) => map,
        _ => return Err(bad_request("Body must be a JSON object")),
    };

    let Some(current) = stores
        .employees
        .get(&matricule)
        .await
        .map_err(|e| store_failure(e, "fetch employee"))?
    else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        })));
    };
    if let Err(e) = current.merged_with(&patch) {
        return Err(bad_request(format!("Invalid employee fields: {e}")));
    }

    let today = today();
    let updated = stores
        .employees
        .update(&matricule, &|employee: &mut Employee| {
            match employee.merged_with(&patch) {
                Ok(merged) => {
                    let hire_date_changed = merged.hire_date != employee.hire_date;
                    *employee = merged;
                    if hire_date_changed {
                        employee.refresh_derived(today);
                    }
                }
                Err(e) => warn!(matricule = %employee.matricule, error = %e, "Update no longer applies"),
            }
        })
        .await
        .map_err(|e| store_failure(e, "update employee"))?;

    match updated {
        Some(employee) => {
            info!(matricule = %matricule, by = %auth.username, "Employee updated");
            Ok(HttpResponse::Ok().json(json!({
                "message": "Employee updated successfully",
                "employee": employee
            })))
        }
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        }))),
    }
}

/// Delete Employee
#[utoipa::path(
    delete,
    path = "/api/employees/{matricule}",
    params(
        ("matricule", Path, description = "Employee matricule")
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        })),
        (status = 500, description = "Internal server error", body = Object)
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_employee(
    auth: AuthUser,
    stores: web::Data<Stores>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let matricule = path.into_inner();

    let deleted = stores
        .employees
        .delete(&matricule)
        .await
        .map_err(|e| store_failure(e, "delete employee"))?;

    if !deleted {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        })));
    }

    info!(matricule = %matricule, by = %auth.username, "Employee deleted");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{bearer, config, stores};
    use crate::model::role::Role;
    use actix_web::{App, test, web::Data};

    macro_rules! app {
        ($dir:expr) => {
            test::init_service(
                App::new()
                    .app_data(Data::new(config(&$dir)))
                    .app_data(stores(&$dir))
                    .route("/employees", web::get().to(list_employees))
                    .route("/employees", web::post().to(create_employee))
                    .route("/employees/{matricule}", web::get().to(get_employee))
                    .route("/employees/{matricule}", web::put().to(update_employee))
                    .route("/employees/{matricule}", web::delete().to(delete_employee)),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn register_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let app = app!(dir);

        let req = test::TestRequest::post()
            .uri("/employees")
            .insert_header(bearer(Role::Hr, None))
            .set_json(json!({
                "matricule": " COL-1 ",
                "surname": "Rakoto",
                "base_salary": "500 000",
                "hire_date": "2020-01-06",
                "initial_leave_balance": "6",
                "leave_balance": -1,
                "phone": "034 11 222 33"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let req = test::TestRequest::get()
            .uri("/employees/COL-1")
            .insert_header(bearer(Role::Employee, Some("COL-1")))
            .to_request();
        let employee: Employee = test::call_and_read_body_json(&app, req).await;
        assert_eq!(employee.surname, "Rakoto");
        assert_eq!(employee.current_leave_balance(), 6.0);
        assert!(employee.entitled);
        assert!(!employee.seniority.is_empty());
        assert_eq!(employee.extra.get("phone"), Some(&json!("034 11 222 33")));
    }

    #[actix_web::test]
    async fn duplicates_and_missing_matricules_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = app!(dir);

        for (body, status) in [
            (json!({"matricule": "COL-1"}), 200),
            (json!({"matricule": "COL-1"}), 409),
            (json!({"surname": "Nobody"}), 400),
        ] {
            let req = test::TestRequest::post()
                .uri("/employees")
                .insert_header(bearer(Role::Admin, None))
                .set_json(body)
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), status);
        }
    }

    #[actix_web::test]
    async fn employees_cannot_register_or_read_others() {
        let dir = tempfile::tempdir().unwrap();
        let app = app!(dir);

        let req = test::TestRequest::post()
            .uri("/employees")
            .insert_header(bearer(Role::Employee, Some("COL-1")))
            .set_json(json!({"matricule": "COL-9"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 403);

        let req = test::TestRequest::get()
            .uri("/employees/COL-2")
            .insert_header(bearer(Role::Employee, Some("COL-1")))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 403);
    }

    #[actix_web::test]
    async fn update_merges_fields_and_keeps_the_matricule() {
        let dir = tempfile::tempdir().unwrap();
        let app = app!(dir);

        let req = test::TestRequest::post()
            .uri("/employees")
            .insert_header(bearer(Role::Hr, None))
            .set_json(json!({"matricule": "COL-1", "campaign": "Outbound"}))
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::put()
            .uri("/employees/COL-1")
            .insert_header(bearer(Role::Hr, None))
            .set_json(json!({"matricule": "HACK", "hire_date": "01/02/2020"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);

        let req = test::TestRequest::get()
            .uri("/employees/COL-1")
            .insert_header(bearer(Role::Hr, None))
            .to_request();
        let employee: Employee = test::call_and_read_body_json(&app, req).await;
        assert_eq!(employee.campaign, "Outbound");
        assert_eq!(employee.hire_date.as_deref(), Some("01/02/2020"));
        assert!(employee.entitled);

        let req = test::TestRequest::put()
            .uri("/employees/COL-1")
            .insert_header(bearer(Role::Hr, None))
            .set_json(json!(["not", "an", "object"]))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 400);

        let req = test::TestRequest::put()
            .uri("/employees/NOPE")
            .insert_header(bearer(Role::Hr, None))
            .set_json(json!({"campaign": "x"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 404);
    }

    #[actix_web::test]
    async fn delete_reports_unknown_records() {
        let dir = tempfile::tempdir().unwrap();
        let app = app!(dir);

        let req = test::TestRequest::post()
            .uri("/employees")
            .insert_header(bearer(Role::Hr, None))
            .set_json(json!({"matricule": "COL-1"}))
            .to_request();
        test::call_service(&app, req).await;

        for status in [200, 404] {
            let req = test::TestRequest::delete()
                .uri("/employees/COL-1")
                .insert_header(bearer(Role::Hr, None))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), status);
        }
    }
}
