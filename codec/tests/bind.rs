use codec::{BindError, CodecError, ParameterBlob, ParameterCodec};
use machine_learning::{
    Model,
    arch::{Sequential, builder, layers::Layer, loss::SoftmaxCrossEntropy},
    optimization::GradientDescent,
};
use tensor::Tensor;

fn small(seed: u64) -> Sequential<SoftmaxCrossEntropy, GradientDescent> {
    Sequential::new(
        [
            Layer::dense((3, 2)),
            Layer::batch_norm(2),
            Layer::relu(2),
            Layer::dense((2, 2)),
        ],
        SoftmaxCrossEntropy,
        GradientDescent::new(0.1),
        seed,
    )
    .unwrap()
}

fn counting(shape: &[usize], start: f32) -> Tensor {
    let len: usize = shape.iter().product();
    Tensor::from_vec(shape, (0..len).map(|i| start + i as f32 * 0.25).collect()).unwrap()
}

fn blob_for_small() -> ParameterBlob {
    let mut blob = ParameterBlob::new();
    blob.push("dense_0", vec![counting(&[3, 2], 0.), counting(&[2], 10.)])
        .unwrap();
    blob.push(
        "batch_norm_0",
        vec![
            counting(&[2], 20.),
            counting(&[2], 30.),
            counting(&[2], 40.),
            counting(&[2], 50.),
        ],
    )
    .unwrap();
    blob.push("dense_1", vec![counting(&[2, 2], 60.), counting(&[2], 70.)])
        .unwrap();
    blob
}

#[test]
fn decode_then_bind_copies_every_tensor_bitwise() {
    let blob = blob_for_small();
    let bytes = ParameterCodec::encode(&blob).unwrap();

    let decoded = ParameterCodec::decode(&bytes).unwrap();
    let mut model = small(0);
    ParameterCodec::bind(&mut model, &decoded).unwrap();

    let expected: Vec<u32> = blob
        .layers()
        .flat_map(|layer| layer.tensors().iter())
        .flat_map(|t| t.as_slice().iter().map(|v| v.to_bits()))
        .collect();
    let actual: Vec<u32> = model.params().iter().map(|v| v.to_bits()).collect();

    assert_eq!(actual, expected);
}

#[test]
fn shape_mismatch_names_the_layer_and_changes_nothing() {
    let mut blob = ParameterBlob::new();
    for layer in blob_for_small().layers() {
        let tensors = if layer.id() == "dense_1" {
            vec![counting(&[2, 3], 0.), counting(&[3], 0.)]
        } else {
            layer.tensors().to_vec()
        };
        blob.push(layer.id(), tensors).unwrap();
    }

    let mut model = small(5);
    let before = model.params().to_vec();

    let err = ParameterCodec::bind(&mut model, &blob).unwrap_err();
    match err {
        BindError::ShapeMismatch {
            layer,
            expected,
            actual,
        } => {
            assert_eq!(layer, "dense_1");
            assert_eq!(expected, vec![vec![2, 2], vec![2]]);
            assert_eq!(actual, vec![vec![2, 3], vec![3]]);
        }
        other => panic!("unexpected error {other}"),
    }

    assert_eq!(model.params(), before.as_slice());
}

#[test]
fn missing_layer_fails_without_binding() {
    let mut blob = ParameterBlob::new();
    for layer in blob_for_small().layers().filter(|l| l.id() != "batch_norm_0") {
        blob.push(layer.id(), layer.tensors().to_vec()).unwrap();
    }

    let mut model = small(1);
    let before = model.params().to_vec();

    let err = ParameterCodec::bind(&mut model, &blob).unwrap_err();
    assert!(matches!(err, BindError::MissingParameter { layer } if layer == "batch_norm_0"));
    assert_eq!(model.params(), before.as_slice());
}

#[test]
fn undeclared_layers_are_ignored() {
    let mut blob = blob_for_small();
    blob.push("dense_9", vec![counting(&[1], 0.)]).unwrap();

    let mut model = small(2);
    ParameterCodec::bind(&mut model, &blob).unwrap();

    assert_eq!(model.params()[0], 0.);
}

#[test]
fn truncated_blob_never_binds() {
    let bytes = ParameterCodec::encode(&blob_for_small()).unwrap();
    let mut model = small(3);
    let before = model.params().to_vec();

    for cut in [1, 4, 11, bytes.len() / 2, bytes.len() - 1] {
        let err = ParameterCodec::decode(&bytes[..cut]).unwrap_err();
        assert!(matches!(err, CodecError::Truncated { .. }), "cut at {cut}: {err}");
    }

    assert_eq!(model.params(), before.as_slice());
}

#[test]
fn trailing_bytes_are_rejected() {
    let mut bytes = ParameterCodec::encode(&blob_for_small()).unwrap();
    bytes.extend([0, 0]);

    assert!(matches!(
        ParameterCodec::decode(&bytes),
        Err(CodecError::Truncated { .. })
    ));
}

#[test]
fn duplicate_layers_are_rejected() {
    let mut bytes = ParameterCodec::encode(&blob_for_small()).unwrap();
    let again = bytes.clone();
    bytes.extend(again);

    assert_eq!(
        ParameterCodec::decode(&bytes),
        Err(CodecError::DuplicateLayer("dense_0".into()))
    );
}

#[test]
fn trained_model_round_trips_through_a_blob() {
    let source = builder::mlp(11).unwrap();
    let mut target = builder::mlp(12).unwrap();
    assert_ne!(source.params(), target.params());

    let blob = ParameterBlob::from_model(&source).unwrap();
    let bytes = ParameterCodec::encode(&blob).unwrap();
    ParameterCodec::bind(&mut target, &ParameterCodec::decode(&bytes).unwrap()).unwrap();

    assert_eq!(source.params(), target.params());
}

#[test]
fn conv_blob_does_not_fit_the_mlp() {
    let conv = builder::conv_net(0).unwrap();
    let blob = ParameterBlob::from_model(&conv).unwrap();
    let mut mlp = builder::mlp(0).unwrap();

    assert!(matches!(
        ParameterCodec::bind(&mut mlp, &blob),
        Err(BindError::ShapeMismatch { layer, .. }) if layer == "dense_0"
    ));
}
