//! Fixtures shared by the loader tests.

use conveyor_core::types::DbId;
use conveyor_core::workflow::{NodeContext, WorkflowData};
use conveyor_db::models::application::Application;
use conveyor_db::models::ascode_event::AsCodeEvent;
use conveyor_db::models::environment::Environment;
use conveyor_db::models::pipeline::Pipeline;
use conveyor_db::models::template::TemplateInstance;
use conveyor_db::models::workflow::Workflow;
use sqlx::types::Json;

pub fn application(id: DbId) -> Application {
    Application {
        id,
        project_id: 1,
        name: format!("app-{id}"),
        description: None,
        vcs_server: "github".into(),
        repo_fullname: format!("org/app-{id}"),
        repository_strategy: Json(Default::default()),
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    }
}

pub fn environment(id: DbId) -> Environment {
    Environment {
        id,
        project_id: 1,
        name: format!("env-{id}"),
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    }
}

pub fn pipeline(id: DbId) -> Pipeline {
    Pipeline {
        id,
        project_id: 1,
        name: format!("pip-{id}"),
        description: None,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    }
}

pub fn template_instance(workflow_id: DbId, used: i64, current: i64) -> TemplateInstance {
    TemplateInstance {
        id: workflow_id * 100,
        workflow_template_id: 9,
        workflow_id: Some(workflow_id),
        workflow_template_version: used,
        template_group_name: "shared".into(),
        template_slug: "deploy".into(),
        template_version: current,
        created_at: chrono::Utc::now(),
    }
}

pub fn as_code_event(id: DbId, workflow_id: DbId, repo: &str) -> AsCodeEvent {
    AsCodeEvent {
        id,
        entity_type: "workflow".into(),
        from_repo: repo.into(),
        operation_uuid: uuid::Uuid::new_v4(),
        entity_id: workflow_id,
        entity_name: format!("w{workflow_id}"),
        outcome: "pushed".into(),
        pull_request_id: None,
        pull_request_url: None,
        username: "alice".into(),
        created_at: chrono::Utc::now(),
    }
}

pub fn context(application_id: DbId, environment_id: DbId, pipeline_id: DbId) -> NodeContext {
    NodeContext {
        application_id,
        environment_id,
        pipeline_id,
        project_integration_id: 0,
    }
}

pub fn workflow(id: DbId, name: &str, data: WorkflowData) -> Workflow {
    let now = chrono::Utc::now();
    Workflow {
        id,
        project_id: 1,
        project_key: "PROJ".into(),
        name: name.into(),
        description: String::new(),
        icon: "data:image/png;base64,AAAA".into(),
        from_repository: String::new(),
        workflow_data: data,
        template_instance: None,
        from_template: String::new(),
        template_up_to_date: false,
        as_code_events: Vec::new(),
        applications: Default::default(),
        environments: Default::default(),
        pipelines: Default::default(),
        project_integrations: Default::default(),
        created_at: now,
        updated_at: now,
    }
}
