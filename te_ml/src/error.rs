use std::path::PathBuf;

error_set::error_set! {
    DatasetError = {
        #[display("Line {line} of {path:?} is not in the `text;label` format")]
        MalformedLine {
            path: PathBuf,
            line: usize,
        },
        #[display("Unknown emotion label '{label}'")]
        UnknownLabel {
            label: String,
        },
    } || IoError || EyreError;

    PrepareError = {
        #[display("Sequences must be at least one token long")]
        EmptySequenceShape,
        #[display("Vocabulary must hold at least the padding and out-of-vocabulary ids, got {num_words}")]
        VocabularyTooSmall {
            num_words: usize,
        },
    } || LabelError;

    LabelError = {
        #[display("Class '{name}' was not observed in the training labels")]
        UnknownClass {
            name: String,
        },
        #[display("Class id {id} is out of range for {num_classes} classes")]
        UnknownId {
            id: usize,
            num_classes: usize,
        },
    };

    LoadError = {
        #[display("Could not find the model at {path:?}")]
        ModelNotFound {
            path: PathBuf,
        },
        #[display("Could not restore the model weights: {reason}")]
        Record {
            reason: String,
        },
        BurnConfig(burn::config::ConfigError),
        Json(serde_json::Error),
    } || IoError;

    InferError = {
        #[display("Could not read tensor data: {reason}")]
        TensorData {
            reason: String,
        },
    } || LabelError;

    IoError = {
        Io(std::io::Error),
    };

    EyreError = {
        #[display("Internal error: {0}")]
        Other(eyre::Error)
    };
}
