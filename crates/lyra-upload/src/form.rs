use lyra_core::{Department, SelectedFile, Visibility};

/// Values entered in the upload dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadForm {
    pub title: String,
    /// `None` lets the backend request fall back to the default department
    pub department: Option<Department>,
    /// Raw comma-separated tag text, parsed at submission
    pub tags: String,
    pub visibility: Visibility,
    pub file: Option<SelectedFile>,
}

/// One editable metadata field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormField {
    Title(String),
    Department(Option<Department>),
    Tags(String),
    Visibility(Visibility),
}

impl UploadForm {
    pub fn apply(&mut self, field: FormField) {
        match field {
            FormField::Title(title) => self.title = title,
            FormField::Department(department) => self.department = department,
            FormField::Tags(tags) => self.tags = tags,
            FormField::Visibility(visibility) => self.visibility = visibility,
        }
    }

    /// Record the chosen file; an empty title is filled from the file name.
    pub fn select_file(&mut self, file: SelectedFile) {
        if self.title.trim().is_empty() {
            self.title = file.stem().to_string();
        }
        self.file = Some(file);
    }

    pub fn is_submittable(&self) -> bool {
        self.file.is_some() && !self.title.trim().is_empty()
    }
}
