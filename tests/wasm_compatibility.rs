#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use rosterdna::{
        AcquisitionType, AssetNode, Direction, LayoutConfig, LayoutStrategy, OriginPolicy,
        PathTracer, RosterOrderTable, derive_attributes, layout_forest, normalize,
    };
    use wasm_bindgen_test::*;

    fn trees() -> Vec<AssetNode> {
        vec![
            AssetNode::player("Jayson Tatum")
                .acquired(AcquisitionType::Draft, "2017-06-22")
                .giving_up([AssetNode::pick("BKN 2017 1st")
                    .acquired(AcquisitionType::Trade, "2013-07-12")
                    .via("BKN")]),
            AssetNode::player("Derrick White")
                .acquired(AcquisitionType::Trade, "2022-02-10")
                .giving_up([
                    AssetNode::player("Josh Richardson").acquired(AcquisitionType::Trade, "2021-07-30"),
                    AssetNode::player("Romeo Langford").acquired(AcquisitionType::Draft, "2019-06-20"),
                    AssetNode::pick("2022 1st (BOS)").acquired(AcquisitionType::Original, "2021-07-29"),
                    AssetNode::pick("2028 swap").acquired(AcquisitionType::Original, "2021-07-29"),
                ]),
        ]
    }

    #[wasm_bindgen_test]
    fn test_normalize_and_trace() {
        let graph = normalize(&trees()).expect("trees should normalize");
        let graph = derive_attributes(graph, &RosterOrderTable::new(), "BOS", OriginPolicy::Global);

        assert_eq!(graph.nodes.len(), 7);
        assert_eq!(graph.origin().map(|node| node.name.as_str()), Some("BKN 2017 1st"));

        let tracer = PathTracer::new(&graph);
        assert_eq!(tracer.ancestors_of(graph.roots[0]).len(), 2);
    }

    #[wasm_bindgen_test]
    fn test_forest_layout_without_clock() {
        let graph = normalize(&trees()).expect("trees should normalize");
        let config = LayoutConfig::new(Direction::Vertical).with_budget(std::time::Duration::ZERO);
        let layout = layout_forest(&graph, &config);

        assert_eq!(layout.strategy, LayoutStrategy::Forest);
        assert_eq!(layout.positions.len(), graph.nodes.len());
    }
}
