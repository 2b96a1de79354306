//! 服务端渲染的 HTML 视图

use clinic_core::{FieldError, Patient, PatientDetails, PatientForm};

use crate::PATIENTS_PATH;

/// 视图渲染接口
pub trait Presenter: Send + Sync {
    /// 首页（搜索入口），可带上一步操作的提示
    fn landing(&self, message: Option<&str>) -> String;

    /// 新增患者表单
    fn add_form(&self, form: &PatientForm, error: Option<&FieldError>) -> String;

    /// 编辑患者表单
    fn edit_form(&self, id: i64, form: &PatientForm, error: Option<&FieldError>) -> String;

    /// 患者详情
    fn details(&self, details: &PatientDetails, message: Option<&str>) -> String;

    /// 搜索结果片段，不含页面框架
    fn patient_list(&self, patients: &[Patient]) -> String;

    /// 通用错误页
    fn error_page(&self, message: &str) -> String;
}

/// 默认的 HTML 视图
#[derive(Debug, Clone, Default)]
pub struct HtmlPresenter;

impl HtmlPresenter {
    pub fn new() -> Self {
        Self
    }
}

/// 转义 HTML 特殊字符
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 0; background: #f4f6f9; color: #333; }}
        .container {{ max-width: 960px; margin: 0 auto; padding: 20px; }}
        .notice {{ background: #e6f4ea; border: 1px solid #9bd3ae; padding: 10px; border-radius: 4px; }}
        .field-error {{ color: #b00020; font-size: 0.9rem; }}
        table {{ width: 100%; border-collapse: collapse; background: white; }}
        th, td {{ padding: 8px; border-bottom: 1px solid #ddd; text-align: left; }}
        label {{ display: block; margin-top: 12px; }}
    </style>
</head>
<body>
    <div class="container">
        <h1><a href="/">Patient records</a></h1>
        {body}
    </div>
</body>
</html>"#,
        title = escape_html(title),
        body = body
    )
}

fn notice(message: Option<&str>) -> String {
    match message {
        Some(text) if !text.is_empty() => {
            format!(r#"<p class="notice">{}</p>"#, escape_html(text))
        }
        _ => String::new(),
    }
}

fn input(label: &str, name: &str, kind: &str, value: &str, error: Option<&FieldError>) -> String {
    let message = error
        .filter(|e| e.field.input_name() == name)
        .map(|e| format!(r#"<span class="field-error">{}</span>"#, escape_html(&e.message)))
        .unwrap_or_default();
    format!(
        r#"<label>{label}<br><input type="{kind}" name="{name}" value="{value}"></label>{message}"#,
        label = label,
        kind = kind,
        name = name,
        value = escape_html(value),
        message = message
    )
}

fn patient_form(action: &str, submit: &str, form: &PatientForm, error: Option<&FieldError>) -> String {
    format!(
        r#"<form method="post" action="{action}">
    {first}
    {last}
    {patronymic}
    {birth}
    {pension}
    <p><button type="submit">{submit}</button></p>
</form>"#,
        action = action,
        first = input("First name", "first_name", "text", &form.first_name, error),
        last = input("Last name", "last_name", "text", &form.last_name, error),
        patronymic = input("Patronymic", "patronymic", "text", &form.patronymic, error),
        birth = input("Birth date", "birth_date", "date", &form.birth_date, error),
        pension = input("Pension number", "pension_number", "text", &form.pension_number, error),
        submit = submit
    )
}

impl Presenter for HtmlPresenter {
    fn landing(&self, message: Option<&str>) -> String {
        let body = format!(
            r#"{notice}
<p><a href="{patients}">Add patient</a></p>
<form id="search">
    <input type="text" name="name" placeholder="Name">
    <input type="text" name="pension" placeholder="Pension number">
    <button type="submit">Search</button>
</form>
<div id="results"></div>
<script>
    document.getElementById('search').addEventListener('submit', async (e) => {{
        e.preventDefault();
        const query = new URLSearchParams(new FormData(e.target)).toString();
        const response = await fetch('{patients}/search?' + query);
        document.getElementById('results').innerHTML = await response.text();
    }});
</script>"#,
            notice = notice(message),
            patients = PATIENTS_PATH
        );
        layout("Patient records", &body)
    }

    fn add_form(&self, form: &PatientForm, error: Option<&FieldError>) -> String {
        let body = format!(
            "<h2>New patient</h2>\n{}",
            patient_form(PATIENTS_PATH, "Add patient", form, error)
        );
        layout("New patient", &body)
    }

    fn edit_form(&self, id: i64, form: &PatientForm, error: Option<&FieldError>) -> String {
        let action = format!("{}/{}", PATIENTS_PATH, id);
        let body = format!(
            "<h2>Edit patient #{}</h2>\n{}",
            id,
            patient_form(&action, "Save", form, error)
        );
        layout("Edit patient", &body)
    }

    fn details(&self, details: &PatientDetails, message: Option<&str>) -> String {
        let patient = &details.patient;
        let consultations = if details.consultations.is_empty() {
            "<p>No consultations yet.</p>".to_string()
        } else {
            let rows: String = details
                .consultations
                .iter()
                .map(|c| {
                    format!(
                        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                        c.held_on.format("%Y-%m-%d"),
                        escape_html(&c.doctor),
                        escape_html(&c.diagnosis),
                        escape_html(c.notes.as_deref().unwrap_or(""))
                    )
                })
                .collect();
            format!(
                "<table><tr><th>Date</th><th>Doctor</th><th>Diagnosis</th><th>Notes</th></tr>{}</table>",
                rows
            )
        };

        let body = format!(
            r#"{notice}
<h2>{name}</h2>
<p>Birth date: {birth}</p>
<p>Pension number: {pension}</p>
<p><a href="{patients}/{id}/edit">Edit</a> <button id="delete">Delete</button></p>
<h3>Consultations</h3>
{consultations}
<script>
    document.getElementById('delete').addEventListener('click', async () => {{
        const response = await fetch('{patients}/{id}', {{ method: 'DELETE' }});
        const result = await response.json();
        alert(result.message);
        if (result.success === 'true') {{ window.location = '/'; }}
    }});
</script>"#,
            notice = notice(message),
            name = escape_html(&patient.full_name()),
            birth = patient.birth_date.format("%Y-%m-%d"),
            pension = escape_html(&patient.pension_number),
            patients = PATIENTS_PATH,
            id = patient.id,
            consultations = consultations
        );
        layout(&patient.full_name(), &body)
    }

    fn patient_list(&self, patients: &[Patient]) -> String {
        if patients.is_empty() {
            return "<p>No patients found.</p>".to_string();
        }
        let rows: String = patients
            .iter()
            .map(|p| {
                format!(
                    r#"<tr><td><a href="{}/{}">{}</a></td><td>{}</td><td>{}</td></tr>"#,
                    PATIENTS_PATH,
                    p.id,
                    escape_html(&p.full_name()),
                    p.birth_date.format("%Y-%m-%d"),
                    escape_html(&p.pension_number)
                )
            })
            .collect();
        format!(
            "<table><tr><th>Name</th><th>Birth date</th><th>Pension number</th></tr>{}</table>",
            rows
        )
    }

    fn error_page(&self, message: &str) -> String {
        let body = format!(
            r#"<h2>Something went wrong</h2><p class="field-error">{}</p><p><a href="/">Back to search</a></p>"#,
            escape_html(message)
        );
        layout("Error", &body)
    }
}
