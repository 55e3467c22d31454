use serde::Serialize;
use thiserror::Error;

/// Every failure the two command line tools can report.
///
/// The `Display` text of each variant is what ends up in the `error` field of the
/// JSON document the host application parses, so the wording is kept in the host's
/// language.
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Argumentos insuficientes")]
    InsufficientArguments,

    #[error("Argumento inválido: {0}")]
    InvalidArgument(String),

    #[error("Modelo não encontrado: {0}")]
    ModelNotFound(String),

    #[error("Pasta do dataset não encontrada: {0}")]
    DatasetNotFound(String),

    #[error("Nenhuma imagem encontrada em: {0}")]
    EmptyDataset(String),

    #[error("Falha ao ler imagem: {0}")]
    Image(#[from] image::ImageError),

    #[error("Falha ao carregar o modelo {path}: {source}")]
    ModelLoad { path: String, source: ort::Error },

    #[error("Erro durante a inferência: {0}")]
    Inference(#[from] ort::Error),

    #[error("Saída do modelo inválida: {0}")]
    ModelOutput(String),

    #[error("Rótulo inválido em {path}:{line}: {reason}")]
    Label {
        path: String,
        line: usize,
        reason: String,
    },

    #[error("Anotação inválida: {0}")]
    Annotation(String),

    #[error("Erro de E/S: {0}")]
    Io(#[from] std::io::Error),

    #[error("Erro ao gerar JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Erro no arquivo de configuração do dataset: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

// Serialized as the bare message so an error can be dropped straight into a report.
impl Serialize for DetectorError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DetectorError>;
