//! Tiny ONNX graphs built in memory, so the tract path can be exercised
//! without shipping model files.

use tract_onnx::pb::{
    attribute_proto::AttributeType, tensor_proto::DataType, tensor_shape_proto::dimension,
    tensor_shape_proto::Dimension, type_proto, AttributeProto, GraphProto, ModelProto, NodeProto,
    OperatorSetIdProto, TensorShapeProto, TypeProto, ValueInfoProto,
};

/// One axis of a graph input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphDim {
    Fixed(i64),
    /// Named symbolic axis such as `N` or `batch_size`
    Symbol(&'static str),
}

fn float_tensor(name: &str, dims: &[GraphDim]) -> ValueInfoProto {
    let dim = dims
        .iter()
        .map(|d| Dimension {
            value: Some(match *d {
                GraphDim::Fixed(n) => dimension::Value::DimValue(n),
                GraphDim::Symbol(s) => dimension::Value::DimParam(s.to_string()),
            }),
            ..Default::default()
        })
        .collect();

    ValueInfoProto {
        name: name.to_string(),
        r#type: Some(TypeProto {
            value: Some(type_proto::Value::TensorType(type_proto::Tensor {
                elem_type: DataType::Float as i32,
                shape: Some(TensorShapeProto { dim }),
            })),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// A graph computing `ReduceMean(input, axes, keepdims = 0)`.
///
/// Averaging the spatial axes of an NHWC input yields one score per channel,
/// all axes but the batch one yield a single score.
pub fn channel_mean_graph(input: [GraphDim; 4], axes: &[i64]) -> ModelProto {
    let node = NodeProto {
        name: "mean".to_string(),
        op_type: "ReduceMean".to_string(),
        input: vec!["input".to_string()],
        output: vec!["scores".to_string()],
        attribute: vec![
            AttributeProto {
                name: "axes".to_string(),
                r#type: AttributeType::Ints as i32,
                ints: axes.to_vec(),
                ..Default::default()
            },
            AttributeProto {
                name: "keepdims".to_string(),
                r#type: AttributeType::Int as i32,
                i: 0,
                ..Default::default()
            },
        ],
        ..Default::default()
    };

    let graph = GraphProto {
        name: "channel_mean".to_string(),
        node: vec![node],
        input: vec![float_tensor("input", &input)],
        output: vec![ValueInfoProto {
            name: "scores".to_string(),
            r#type: Some(TypeProto {
                value: Some(type_proto::Value::TensorType(type_proto::Tensor {
                    elem_type: DataType::Float as i32,
                    shape: None,
                })),
                ..Default::default()
            }),
            ..Default::default()
        }],
        ..Default::default()
    };

    ModelProto {
        ir_version: 7,
        opset_import: vec![OperatorSetIdProto {
            domain: String::new(),
            version: 13,
        }],
        graph: Some(graph),
        ..Default::default()
    }
}
